use std::io::{ErrorKind, Read};

use crate::codec::Packet;
use crate::error::{FrameError, Result};
use crate::framer::Framer;

/// Default read size; the firmware never sends more than a handful of frames at once.
pub const DEFAULT_READ_CHUNK: usize = 64;

/// Reads complete packets from any `Read` stream.
///
/// Handles partial reads internally; callers always get whole packets.
/// A read timeout on the inner stream surfaces as `FrameError::Io` with kind
/// `WouldBlock` or `TimedOut`; buffered bytes are kept and the call can be
/// retried.
pub struct PacketReader<T> {
    inner: T,
    framer: Framer,
    chunk_size: usize,
}

impl<T: Read> PacketReader<T> {
    pub fn new(inner: T) -> Self {
        Self::with_chunk_size(inner, DEFAULT_READ_CHUNK)
    }

    pub fn with_chunk_size(inner: T, chunk_size: usize) -> Self {
        Self {
            inner,
            framer: Framer::new(),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Read the next complete packet (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_packet(&mut self) -> Result<Packet> {
        let mut chunk = vec![0u8; self.chunk_size];
        loop {
            if let Some(packet) = self.framer.next_packet()? {
                return Ok(packet);
            }

            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.framer.extend(&chunk[..read]);
        }
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn buffered(&self) -> usize {
        self.framer.buffered()
    }
}

/// True for the error kinds a stream read timeout produces.
pub fn is_timeout(err: &FrameError) -> bool {
    matches!(
        err,
        FrameError::Io(io) if matches!(io.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
    )
}
