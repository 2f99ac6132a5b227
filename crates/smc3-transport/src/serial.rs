use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::SerialStream;

/// Bit rate the SMC3 firmware ships with.
pub const DEFAULT_BAUD_RATE: u32 = 500_000;

/// Default read timeout. Readers treat it as a polling tick, not a failure.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Configuration for opening a serial device.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0` or `COM3`.
    pub path: String,
    /// Line speed in bits per second. Default: 500000.
    pub baud_rate: u32,
    /// Read timeout applied to the opened port.
    pub read_timeout: Duration,
}

impl SerialConfig {
    /// Configuration for `path` with default line settings.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Override the bit rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Override the read timeout.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }
}

/// Open a serial device: 8 data bits, no parity, 1 stop bit, no flow control.
pub fn open(config: &SerialConfig) -> Result<SerialStream> {
    let port = serialport::new(&config.path, config.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(config.read_timeout)
        .open()
        .map_err(|source| TransportError::Open {
            path: config.path.clone(),
            source,
        })?;

    info!(path = %config.path, baud_rate = config.baud_rate, "opened serial device");
    Ok(SerialStream::from_port(port))
}

/// Open a pseudo-terminal pair.
///
/// Returns the master side as a stream together with the slave device path.
/// Whatever opens the path behaves like a host attached to real hardware;
/// the master side plays the device.
#[cfg(unix)]
pub fn pty_pair() -> Result<(SerialStream, SerialStream, String)> {
    let (master, slave) = serialport::TTYPort::pair()?;
    let path = serialport::SerialPort::name(&slave).ok_or(TransportError::Unsupported(
        "pseudo-terminal slave has no device path",
    ))?;
    debug!(%path, "opened pseudo-terminal pair");
    Ok((
        SerialStream::from_port(Box::new(master)),
        SerialStream::from_port(Box::new(slave)),
        path,
    ))
}
