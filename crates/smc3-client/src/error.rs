use std::time::Duration;

/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] smc3_transport::TransportError),

    /// Frame-level error, including argument validation.
    #[error("frame error: {0}")]
    Frame(#[from] smc3_frame::FrameError),

    /// No frame with the awaited tag arrived in time.
    #[error("no reply for tag '{}' after {after:?}", escaped(.tag))]
    Timeout { tag: u8, after: Duration },

    /// The device went away; the session is over.
    #[error("device disconnected")]
    Disconnected,
}

fn escaped(tag: &u8) -> std::ascii::EscapeDefault {
    std::ascii::escape_default(*tag)
}

pub type Result<T> = std::result::Result<T, ClientError>;
