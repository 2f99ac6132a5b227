//! Request/response correlation for SMC3 controllers.
//!
//! A [`Client`] writes frames to the device, waits for replies by wait tag
//! (the code byte the reply carries) and routes every frame nobody is
//! waiting for to a [`TelemetrySubscriber`]. [`Controller`] layers the
//! controller's commands on top.
//!
//! Losing the device ends the session: pending and later reads fail with
//! [`ClientError::Disconnected`] and nothing reconnects.

pub mod client;
pub mod connector;
pub mod controller;
mod dispatch;
pub mod error;
mod pending;
pub mod telemetry;

pub use client::{Client, ClientConfig, DEFAULT_TIMEOUT};
pub use connector::connect;
pub use controller::Controller;
pub use error::{ClientError, Result};
pub use telemetry::{
    ChannelSubscriber, PositionUpdate, PwmStatusUpdate, TelemetryEvent, TelemetrySubscriber,
};
