use bytes::BytesMut;
use tracing::trace;

use crate::codec::{decode_packet, Packet};
use crate::error::Result;

const INITIAL_BUFFER_CAPACITY: usize = 64;

/// Turns an arbitrarily chunked byte stream into packets.
///
/// Bytes are sliced into fixed five-byte frames in arrival order. There is no
/// resynchronisation: the delimiters are never inspected, so a dropped or
/// extra byte shifts every later frame. Incomplete tails are kept until the
/// next delivery.
#[derive(Debug, Default)]
pub struct Framer {
    buf: BytesMut,
}

impl Framer {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Append a delivery from the transport.
    pub fn extend(&mut self, data: &[u8]) {
        trace!(bytes = data.len(), buffered = self.buf.len(), "data received");
        self.buf.extend_from_slice(data);
    }

    /// Take the next complete packet, if five bytes are buffered.
    pub fn next_packet(&mut self) -> Result<Option<Packet>> {
        decode_packet(&mut self.buf)
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}
