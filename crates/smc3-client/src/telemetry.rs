//! Unsolicited feedback frames.
//!
//! Once continuous feedback is enabled the controller streams a position
//! frame and a PWM/status frame per motor, whether or not anyone asked.
//! Frames that do not resolve a pending read are handed to a
//! [`TelemetrySubscriber`] on the reader thread, so implementations must not
//! block.

use std::sync::Arc;

use smc3_frame::Motor;
use tokio::sync::mpsc;

/// Position feedback: commanded target and measured feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionUpdate {
    pub motor: Motor,
    pub target: u8,
    pub feedback: u8,
}

/// PWM duty and status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmStatusUpdate {
    pub motor: Motor,
    pub pwm: u8,
    pub status: u8,
}

/// Either kind of telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryEvent {
    Position(PositionUpdate),
    PwmStatus(PwmStatusUpdate),
}

impl TelemetryEvent {
    pub fn motor(&self) -> Motor {
        match self {
            TelemetryEvent::Position(update) => update.motor,
            TelemetryEvent::PwmStatus(update) => update.motor,
        }
    }
}

/// Receives unsolicited telemetry. Both methods default to doing nothing.
pub trait TelemetrySubscriber: Send + Sync {
    fn on_position(&self, _update: PositionUpdate) {}

    fn on_pwm_status(&self, _update: PwmStatusUpdate) {}
}

/// Ignores all telemetry.
impl TelemetrySubscriber for () {}

impl<T: TelemetrySubscriber + ?Sized> TelemetrySubscriber for Arc<T> {
    fn on_position(&self, update: PositionUpdate) {
        (**self).on_position(update);
    }

    fn on_pwm_status(&self, update: PwmStatusUpdate) {
        (**self).on_pwm_status(update);
    }
}

/// Forwards telemetry into an unbounded queue.
///
/// Sending never blocks; events are dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelSubscriber {
    tx: mpsc::UnboundedSender<TelemetryEvent>,
}

impl ChannelSubscriber {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TelemetryEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl TelemetrySubscriber for ChannelSubscriber {
    fn on_position(&self, update: PositionUpdate) {
        let _ = self.tx.send(TelemetryEvent::Position(update));
    }

    fn on_pwm_status(&self, update: PwmStatusUpdate) {
        let _ = self.tx.send(TelemetryEvent::PwmStatus(update));
    }
}
