use crate::codec::ParamCode;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A frame was not exactly five bytes long.
    #[error("invalid frame size {0} (expected 5)")]
    InvalidFrameSize(usize),

    /// The parameter cannot be written.
    #[error("parameter {0} is read-only")]
    ReadOnly(ParamCode),

    /// Wrong number of values for the parameter's set command.
    #[error("invalid argument count for parameter {param}: got {got}, required {expected}")]
    InvalidArgumentCount {
        param: ParamCode,
        got: usize,
        expected: usize,
    },

    /// A value is outside the parameter's declared bound.
    #[error("value {value} out of range {min}..={max} for parameter {param}")]
    OutOfRange {
        param: ParamCode,
        value: u16,
        min: u16,
        max: u16,
    },

    /// The value formatter accepts exactly one or two values.
    #[error("invalid number of values {0}")]
    InvalidValueCount(usize),

    /// A dual-value frame carries each value in a single byte.
    #[error("value {0} does not fit in a single byte")]
    ByteOverflow(u16),

    /// The parameter is configured with a value count the decoder cannot handle.
    #[error("invalid value count setup for parameter {param}: {count}")]
    UnsupportedValueCount { param: ParamCode, count: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The other end of the stream went away.
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
