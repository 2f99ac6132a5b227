//! Deterministic SMC3 device for tests and demos.
//!
//! A [`MockEndpoint`] owns the device end of a byte channel and a table of
//! [`Stub`]s. A background reader accumulates inbound bytes and answers
//! every stub whose prefix matches the front of the buffer. Overlapping
//! prefixes stall the buffer instead of picking a winner, so a misconfigured
//! stub set shows up as missing replies.

pub mod device;
pub mod endpoint;
pub mod error;
pub mod stub;

pub use device::{idle_telemetry, smc3_device};
pub use endpoint::{
    match_and_reply, MockConfig, MockEndpoint, DEFAULT_READ_CHUNK, DEFAULT_SHUTDOWN_TIMEOUT,
    QUIT_SENTINEL,
};
pub use error::{MockError, Result};
pub use stub::{ReplyFn, Stub, StubHandle};
