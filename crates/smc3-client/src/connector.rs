use smc3_transport::SerialConfig;
use tracing::info;

use crate::client::{Client, ClientConfig};
use crate::error::Result;
use crate::telemetry::TelemetrySubscriber;

/// Open the serial device described by `serial` and start a client on it.
pub fn connect(
    serial: &SerialConfig,
    subscriber: impl TelemetrySubscriber + 'static,
    config: ClientConfig,
) -> Result<Client> {
    let stream = config
        .span
        .in_scope(|| smc3_transport::open(serial))?;
    let client = Client::new(stream, subscriber, config)?;
    info!(path = %serial.path, baud_rate = serial.baud_rate, "connected");
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;

    #[test]
    fn connect_to_missing_device_is_a_transport_error() {
        let serial = SerialConfig::new("/dev/smc3-missing");
        let err = connect(&serial, (), ClientConfig::default()).unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }
}
