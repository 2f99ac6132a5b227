use smc3_frame::{ParamCode, Packet, Parameter, Values};
use tracing::{debug, trace};

use crate::pending::PendingTable;
use crate::telemetry::{PositionUpdate, PwmStatusUpdate, TelemetrySubscriber};

/// Routes decoded packets: pending reads first, then telemetry.
pub(crate) struct Dispatcher {
    pub pending: PendingTable,
    subscriber: Box<dyn TelemetrySubscriber>,
}

impl Dispatcher {
    pub fn new(subscriber: Box<dyn TelemetrySubscriber>) -> Self {
        Self {
            pending: PendingTable::default(),
            subscriber,
        }
    }

    /// Handle one inbound packet. Runs on the reader thread.
    pub fn packet_received(&self, packet: Packet) {
        trace!(%packet, "packet received");

        let Some(packet) = self.pending.resolve(packet) else {
            return;
        };

        match (packet.param, packet.values) {
            (ParamCode::Known(Parameter::Position), Values::Pair(target, feedback)) => {
                self.subscriber.on_position(PositionUpdate {
                    motor: packet.motor,
                    target,
                    feedback,
                });
            }
            (ParamCode::Known(Parameter::PwmStatus), Values::Pair(pwm, status)) => {
                self.subscriber.on_pwm_status(PwmStatusUpdate {
                    motor: packet.motor,
                    pwm,
                    status,
                });
            }
            _ => debug!(%packet, "dropping unsolicited packet"),
        }
    }

    /// Fail every outstanding read; later registrations are refused.
    pub fn disconnect(&self) {
        let dropped = self.pending.close();
        if dropped > 0 {
            debug!(dropped, "dropped pending reads on disconnect");
        }
    }

    pub fn is_disconnected(&self) -> bool {
        self.pending.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use smc3_frame::{parse_packet, Motor};

    use super::*;
    use crate::telemetry::{ChannelSubscriber, TelemetryEvent};

    fn dispatcher() -> (
        Dispatcher,
        tokio::sync::mpsc::UnboundedReceiver<TelemetryEvent>,
    ) {
        let (subscriber, rx) = ChannelSubscriber::new();
        (Dispatcher::new(Box::new(subscriber)), rx)
    }

    #[test]
    fn position_frames_become_position_updates() {
        let (dispatcher, mut rx) = dispatcher();

        dispatcher.packet_received(parse_packet(b"[B\x64\x0a]").unwrap());

        assert_eq!(
            rx.try_recv().unwrap(),
            TelemetryEvent::Position(PositionUpdate {
                motor: Motor::B,
                target: 100,
                feedback: 10,
            })
        );
    }

    #[test]
    fn pwm_frames_become_pwm_updates() {
        let (dispatcher, mut rx) = dispatcher();

        dispatcher.packet_received(parse_packet(b"[c\xc8\x0d]").unwrap());

        assert_eq!(
            rx.try_recv().unwrap(),
            TelemetryEvent::PwmStatus(PwmStatusUpdate {
                motor: Motor::C,
                pwm: 200,
                status: 13,
            })
        );
    }

    #[test]
    fn other_unsolicited_frames_are_dropped() {
        let (dispatcher, mut rx) = dispatcher();

        dispatcher.packet_received(parse_packet(b"[D\x00\x10]").unwrap());
        dispatcher.packet_received(parse_packet(b"[v\x00\x65]").unwrap());
        dispatcher.packet_received(parse_packet(b"[Z\x00\x00]").unwrap());

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn pending_read_takes_priority_over_telemetry() {
        let (dispatcher, mut rx) = dispatcher();
        let mut registration = dispatcher.pending.register(b'A').unwrap();

        dispatcher.packet_received(parse_packet(b"[A\x64\x0a]").unwrap());
        assert_eq!(
            registration.rx.try_recv().unwrap().values,
            Values::Pair(100, 10)
        );
        assert!(rx.try_recv().is_err());

        // The next one is unsolicited again.
        dispatcher.packet_received(parse_packet(b"[A\x65\x0b]").unwrap());
        assert!(matches!(rx.try_recv(), Ok(TelemetryEvent::Position(_))));
    }

    #[test]
    fn disconnect_closes_pending_table() {
        let (dispatcher, _rx) = dispatcher();
        let _registration = dispatcher.pending.register(b'v').unwrap();

        dispatcher.disconnect();

        assert!(dispatcher.is_disconnected());
        assert!(dispatcher.pending.tags().is_empty());
    }
}
