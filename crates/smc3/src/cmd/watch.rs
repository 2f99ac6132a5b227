use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use smc3_client::{ChannelSubscriber, Client, TelemetryEvent};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use crate::cmd::{connect, install_ctrlc_handler, Session, WatchArgs};
use crate::exit::{client_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_telemetry, version_string, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub async fn run(args: WatchArgs, session: &Session, format: OutputFormat) -> CliResult<i32> {
    let running = install_ctrlc_handler()?;
    let (subscriber, mut events) = ChannelSubscriber::new();
    let controller = connect(&args.device, session, subscriber)?;

    let version = controller
        .version()
        .await
        .map_err(|err| client_error("version read failed", err))?;
    info!(version = %version_string(version), motor = %args.motor, "watching telemetry");

    controller
        .enable_feedback(args.motor)
        .map_err(|err| client_error("enable feedback failed", err))?;

    let outcome = pump(&mut events, &running, controller.client(), |event| {
        print_telemetry(event, format)
    })
    .await;

    if let Err(err) = controller.disable_feedback() {
        warn!(error = %err, "disable feedback failed");
    }
    outcome
}

/// Hand telemetry to `emit` until `running` clears or the device goes away.
async fn pump(
    events: &mut UnboundedReceiver<TelemetryEvent>,
    running: &AtomicBool,
    client: &Client,
    mut emit: impl FnMut(&TelemetryEvent),
) -> CliResult<i32> {
    while running.load(Ordering::SeqCst) {
        match tokio::time::timeout(POLL_INTERVAL, events.recv()).await {
            Ok(Some(event)) => emit(&event),
            Ok(None) => return Err(CliError::new(FAILURE, "telemetry channel closed")),
            Err(_) => {
                if client.is_disconnected() {
                    return Err(CliError::new(FAILURE, "device disconnected"));
                }
            }
        }
    }
    Ok(SUCCESS)
}
