use std::io::{Read, Write};
use std::time::Duration;

use tracing::debug;

use crate::error::Result;

/// Stand-in for "no timeout" on serial ports, which always poll with one.
const BLOCKING_SERIAL_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// A connected byte-duplex stream implementing Read + Write.
///
/// This is the only I/O type the frame, client and mock layers see.
/// A read returning `Ok(0)` means the other side disconnected; a read failing
/// with `TimedOut`/`WouldBlock` means the configured read timeout elapsed.
pub struct SerialStream {
    inner: StreamInner,
}

enum StreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
    Serial(Box<dyn serialport::SerialPort>),
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.read(buf),
            StreamInner::Serial(port) => port.read(buf),
        }
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.write(buf),
            StreamInner::Serial(port) => port.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.flush(),
            StreamInner::Serial(port) => port.flush(),
        }
    }
}

impl SerialStream {
    /// Wrap an already opened serial port.
    pub fn from_port(port: Box<dyn serialport::SerialPort>) -> Self {
        Self {
            inner: StreamInner::Serial(port),
        }
    }

    #[cfg(unix)]
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: StreamInner::Unix(stream),
        }
    }

    /// Set read timeout on the underlying stream. `None` blocks indefinitely.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            StreamInner::Serial(port) => port
                .set_timeout(timeout.unwrap_or(BLOCKING_SERIAL_TIMEOUT))
                .map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => Ok(Self::from_unix(stream.try_clone()?)),
            StreamInner::Serial(port) => Ok(Self::from_port(port.try_clone()?)),
        }
    }

    /// Close both directions of the stream.
    ///
    /// Every clone observes the shutdown: pending and future reads on the
    /// peer return EOF. Serial ports have no half-close; they are released
    /// when the last handle is dropped, so this is a no-op for them.
    pub fn shutdown(&self) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => match stream.shutdown(std::net::Shutdown::Both) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
                Err(err) => Err(err.into()),
            },
            StreamInner::Serial(port) => {
                debug!(port = ?port.name(), "serial ports close on drop");
                Ok(())
            }
        }
    }

    /// Human-readable stream name for diagnostics.
    pub fn name(&self) -> String {
        match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(_) => "loopback".to_string(),
            StreamInner::Serial(port) => port.name().unwrap_or_else(|| "serial".to_string()),
        }
    }
}

impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(_) => f
                .debug_struct("SerialStream")
                .field("type", &"loopback")
                .finish(),
            StreamInner::Serial(port) => f
                .debug_struct("SerialStream")
                .field("type", &"serial")
                .field("name", &port.name())
                .finish(),
        }
    }
}

/// Create two connected in-process streams.
///
/// Bytes written to one end are read from the other, in both directions.
#[cfg(unix)]
pub fn loopback() -> Result<(SerialStream, SerialStream)> {
    let (left, right) = std::os::unix::net::UnixStream::pair()?;
    debug!("created loopback stream pair");
    Ok((SerialStream::from_unix(left), SerialStream::from_unix(right)))
}

/// Create two connected in-process streams.
#[cfg(not(unix))]
pub fn loopback() -> Result<(SerialStream, SerialStream)> {
    Err(crate::error::TransportError::Unsupported(
        "loopback streams require unix domain sockets",
    ))
}
