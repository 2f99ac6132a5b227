//! Byte-duplex transport for SMC3 motor controllers.
//!
//! The rest of the workspace only needs three things from a transport:
//! write bytes out, read bytes in, and notice when the other side went away.
//! [`SerialStream`] provides exactly that over:
//! - a serial device opened at a configurable bit rate (8N1),
//! - an in-process loopback socket pair (tests, in-process mock device),
//! - a pseudo-terminal pair (unix) so external tools can open a mock device.

pub mod error;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use serial::{open, SerialConfig, DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT};
pub use traits::{loopback, SerialStream};

#[cfg(unix)]
pub use serial::pty_pair;
