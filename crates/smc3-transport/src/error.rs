/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the specified device.
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        source: serialport::Error,
    },

    /// An I/O error occurred on the stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A device-level error that is not tied to opening a path.
    #[error("serial device error: {0}")]
    Device(#[from] serialport::Error),

    /// The operation is not available for this kind of stream or platform.
    #[error("unsupported transport operation: {0}")]
    Unsupported(&'static str),
}

impl TransportError {
    /// True if the device exists but the caller may not open it.
    pub fn is_permission_denied(&self) -> bool {
        let permission_denied = serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied);
        match self {
            TransportError::Open { source, .. } | TransportError::Device(source) => {
                source.kind() == permission_denied
            }
            TransportError::Io(err) => err.kind() == std::io::ErrorKind::PermissionDenied,
            TransportError::Unsupported(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_is_detected_through_serialport_errors() {
        let err = TransportError::Open {
            path: "/dev/ttyUSB0".to_string(),
            source: serialport::Error::new(
                serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied),
                "Permission denied",
            ),
        };
        assert!(err.is_permission_denied());
        assert!(!TransportError::Unsupported("pty").is_permission_denied());
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
