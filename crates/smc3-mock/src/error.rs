/// Errors that can occur while running a mock device.
#[derive(Debug, thiserror::Error)]
pub enum MockError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] smc3_transport::TransportError),

    /// A canned reply could not be encoded.
    #[error("frame error: {0}")]
    Frame(#[from] smc3_frame::FrameError),

    /// I/O error on the device side of the channel.
    #[error("mock I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `open()` was called twice.
    #[error("mock device already open")]
    AlreadyOpen,

    /// The endpoint has been shut down.
    #[error("mock device closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, MockError>;
