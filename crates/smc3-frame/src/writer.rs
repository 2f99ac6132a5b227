use std::io::{ErrorKind, Write};

use crate::error::{FrameError, Result};

/// Blocking frame writer over any `Write` stream.
///
/// Each frame is written in full and flushed before returning. There is no
/// queueing and no flow control: a slow link simply makes the call block.
pub struct FrameWriter<T> {
    inner: T,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Write raw bytes as-is and flush them, retrying interrupted and would-block writes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.inner.write(&bytes[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush whatever the stream still buffers.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }
}
