//! Host-side driver for SMC3 motion simulator controllers.
//!
//! # Crate Structure
//!
//! - [`transport`]: Serial, loopback and pseudo-terminal byte streams
//! - [`frame`]: Fixed 5-byte frame codec and stream framing
//! - [`client`]: Request/response correlation and telemetry (behind `client` feature)
//! - [`mock`]: Stub-driven simulated device (behind `mock` feature)

/// Re-export transport types.
pub mod transport {
    pub use smc3_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use smc3_frame::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use smc3_client::*;
}

/// Re-export mock device types (requires `mock` feature).
#[cfg(feature = "mock")]
pub mod mock {
    pub use smc3_mock::*;
}
