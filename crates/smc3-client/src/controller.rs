//! Convenience layer over [`Client`] speaking in motors and parameters.

use std::time::Duration;

use smc3_frame::{
    enable_motor, feedback_on, read_request, set_command, Motor, Packet, Parameter, Values,
    ENABLE_ALL, FEEDBACK_OFF, SAVE, VERSION, VERSION_TAG,
};
use smc3_transport::SerialConfig;
use tracing::info;

use crate::client::{Client, ClientConfig};
use crate::connector::connect;
use crate::error::Result;
use crate::telemetry::TelemetrySubscriber;

/// An SMC3 controller.
///
/// Reads wait up to the client's configured timeout; commands are
/// fire-and-forget.
#[derive(Debug)]
pub struct Controller {
    client: Client,
}

impl Controller {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Open `serial` and wrap the resulting client.
    pub fn connect(
        serial: &SerialConfig,
        subscriber: impl TelemetrySubscriber + 'static,
        config: ClientConfig,
    ) -> Result<Self> {
        connect(serial, subscriber, config).map(Self::new)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn into_client(self) -> Client {
        self.client
    }

    /// Firmware version times 100 (101 is v1.01).
    pub async fn version(&self) -> Result<u16> {
        let packet = self
            .client
            .make_read_request(&VERSION, VERSION_TAG, self.timeout())
            .await?;
        Ok(packet.values.as_u16())
    }

    /// Current value of `param` on `motor`.
    pub async fn read_param(&self, motor: Motor, param: Parameter) -> Result<Values> {
        if !param.is_motor_indexed() {
            return self.version().await.map(Values::Single);
        }
        let packet = self
            .client
            .read_parameter(motor, param, self.timeout())
            .await?;
        Ok(packet.values)
    }

    /// Read an arbitrary code with `[rd<code>]`, waiting on the same code.
    pub async fn read_raw(&self, code: u8) -> Result<Packet> {
        self.client
            .make_read_request(&read_request(code), code, self.timeout())
            .await
    }

    /// Validate and write `values` to `param` on `motor`.
    pub fn set_param(&self, motor: Motor, param: Parameter, values: &[u16]) -> Result<()> {
        let frame = set_command(motor, param, values)?;
        self.client.send_command(&frame)
    }

    pub fn set_position(&self, motor: Motor, position: u16) -> Result<()> {
        self.set_param(motor, Parameter::Position, &[position])
    }

    /// Persist the current parameters on the controller.
    pub fn save_settings(&self) -> Result<()> {
        self.client.send_command(&SAVE)
    }

    pub fn enable_motors(&self) -> Result<()> {
        self.client.send_command(&ENABLE_ALL)
    }

    pub fn enable_motor(&self, motor: Motor) -> Result<()> {
        self.client.send_command(&enable_motor(motor))
    }

    /// Start streaming position and PWM/status telemetry for `motor`.
    pub fn enable_feedback(&self, motor: Motor) -> Result<()> {
        info!(%motor, "enable feedback");
        self.client.send_command(&feedback_on(motor))
    }

    /// Stop all telemetry.
    pub fn disable_feedback(&self) -> Result<()> {
        info!("disable feedback");
        self.client.send_command(&FEEDBACK_OFF)
    }

    fn timeout(&self) -> Duration {
        self.client.timeout()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::{Read, Write};
    use std::thread;

    use smc3_frame::FrameError;
    use smc3_transport::{loopback, SerialStream};

    use super::*;
    use crate::error::ClientError;

    fn controller() -> (Controller, SerialStream) {
        let (host, device) = loopback().unwrap();
        let client = Client::new(host, (), ClientConfig::default()).unwrap();
        (Controller::new(client), device)
    }

    fn read_frames(device: &mut SerialStream, count: usize) -> Vec<u8> {
        let mut buf = vec![0u8; count * 5];
        device.read_exact(&mut buf).unwrap();
        buf
    }

    #[tokio::test]
    async fn version_reads_raw_value() {
        let (controller, mut device) = controller();
        let responder = thread::spawn(move || {
            assert_eq!(read_frames(&mut device, 1), b"[ver]");
            device.write_all(b"[v\x00\x65]").unwrap();
            device
        });

        assert_eq!(controller.version().await.unwrap(), 101);
        let _device = responder.join().unwrap();
    }

    #[tokio::test]
    async fn read_param_returns_pairs_for_position() {
        let (controller, mut device) = controller();
        let responder = thread::spawn(move || {
            assert_eq!(read_frames(&mut device, 1), b"[rdC]");
            device.write_all(b"[C\x64\x0a]").unwrap();
            device
        });

        let values = controller
            .read_param(Motor::C, Parameter::Position)
            .await
            .unwrap();
        assert_eq!(values, Values::Pair(100, 10));
        let _device = responder.join().unwrap();
    }

    #[tokio::test]
    async fn read_raw_waits_on_the_given_code() {
        let (controller, mut device) = controller();
        let responder = thread::spawn(move || {
            assert_eq!(read_frames(&mut device, 1), b"[rdv]");
            device.write_all(b"[v\x00\x65]").unwrap();
            device
        });

        let packet = controller.read_raw(b'v').await.unwrap();
        assert_eq!(packet.values, Values::Single(101));
        let _device = responder.join().unwrap();
    }

    #[test]
    fn commands_reach_the_wire_in_order() {
        let (controller, mut device) = controller();

        controller.enable_feedback(Motor::B).unwrap();
        controller.set_position(Motor::B, 512).unwrap();
        controller.disable_feedback().unwrap();
        controller.enable_motors().unwrap();
        controller.enable_motor(Motor::A).unwrap();
        controller.save_settings().unwrap();

        assert_eq!(
            read_frames(&mut device, 6),
            b"[mo2][B\x02\x00][mo0][ena][en1][sav]"
        );
    }

    #[test]
    fn invalid_writes_never_reach_the_wire() {
        let (controller, _device) = controller();

        let err = controller.set_position(Motor::A, 1025).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Frame(FrameError::OutOfRange { value: 1025, .. })
        ));

        let err = controller
            .set_param(Motor::A, Parameter::Version, &[1])
            .unwrap_err();
        assert!(matches!(err, ClientError::Frame(FrameError::ReadOnly(_))));
    }
}
