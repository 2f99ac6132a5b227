use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use smc3_client::{ClientConfig, Controller, TelemetrySubscriber};
use smc3_frame::Motor;
use smc3_transport::SerialConfig;

use crate::exit::{client_error, CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod mock;
pub mod read;
pub mod set_position;
pub mod status;
pub mod version;
pub mod watch;
pub mod wave;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the controller firmware version.
    Version(DeviceArgs),
    /// Send `[rd<CODE>]` and print the decoded reply.
    Read(ReadArgs),
    /// Print version, gains, limits and live values of every motor.
    Status(DeviceArgs),
    /// Move one motor to a position and hold it briefly.
    SetPosition(SetPositionArgs),
    /// Print position and PWM/status telemetry of one motor until Ctrl-C.
    Watch(WatchArgs),
    /// Drive motors along a sine pattern until Ctrl-C.
    Wave(WaveArgs),
    /// Serve a simulated controller on a pseudo-terminal until Ctrl-C.
    Mock(MockArgs),
}

/// Connection settings shared by every device subcommand.
#[derive(Debug, Clone)]
pub struct Session {
    pub baud_rate: u32,
    pub timeout: Duration,
}

pub fn run(command: Command, session: &Session, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Version(args) => block_on(version::run(args, session, format)),
        Command::Read(args) => block_on(read::run(args, session, format)),
        Command::Status(args) => block_on(status::run(args, session, format)),
        Command::SetPosition(args) => block_on(set_position::run(args, session, format)),
        Command::Watch(args) => block_on(watch::run(args, session, format)),
        Command::Wave(args) => block_on(wave::run(args, session, format)),
        Command::Mock(args) => mock::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct DeviceArgs {
    /// Serial device, e.g. /dev/ttyUSB0 or COM3.
    pub device: String,
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Serial device, e.g. /dev/ttyUSB0 or COM3.
    pub device: String,
    /// Single code character to read, e.g. `D` for Kp of motor A.
    pub code: String,
}

#[derive(Args, Debug)]
pub struct SetPositionArgs {
    /// Serial device, e.g. /dev/ttyUSB0 or COM3.
    pub device: String,
    /// Motor to move (A, B or C).
    pub motor: Motor,
    /// Target position (0-1024).
    pub position: u16,
    /// How long to keep feedback on after the move (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s")]
    pub hold: String,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Serial device, e.g. /dev/ttyUSB0 or COM3.
    pub device: String,
    /// Motor to monitor (A, B or C).
    pub motor: Motor,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum WavePattern {
    /// One motor follows a sine.
    Sine,
    /// Motors A and B rock against each other.
    Rock,
    /// All three motors, 120 degrees apart.
    ThreePhase,
}

#[derive(Args, Debug)]
pub struct WaveArgs {
    /// Serial device, e.g. /dev/ttyUSB0 or COM3.
    pub device: String,
    /// Motion pattern.
    #[arg(long, value_enum, default_value = "sine")]
    pub pattern: WavePattern,
    /// Motor driven by the sine pattern.
    #[arg(long, default_value = "A")]
    pub motor: Motor,
    /// Time scale; 2.0 runs twice as fast.
    #[arg(long, default_value_t = 1.0)]
    pub scale: f64,
    /// Rock both motors in the same direction.
    #[arg(long)]
    pub sideways: bool,
}

#[derive(Args, Debug)]
pub struct MockArgs {
    /// Version the simulated controller reports, times 100.
    #[arg(long, default_value_t = 101)]
    pub firmware_version: u16,
    /// Interval between idle telemetry bursts (e.g. 100ms).
    #[arg(long, default_value = "100ms")]
    pub interval: String,
}

fn block_on<F: Future<Output = CliResult<i32>>>(future: F) -> CliResult<i32> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("runtime setup failed: {err}")))?;
    runtime.block_on(future)
}

/// Open `device` and wrap it in a controller.
pub fn connect(
    device: &str,
    session: &Session,
    subscriber: impl TelemetrySubscriber + 'static,
) -> CliResult<Controller> {
    let serial = SerialConfig::new(device).with_baud_rate(session.baud_rate);
    let config = ClientConfig::default()
        .with_timeout(session.timeout)
        .with_span(tracing::info_span!("smc3", device));
    Controller::connect(&serial, subscriber, config)
        .map_err(|err| client_error("connect failed", err))
}

/// Set by the Ctrl-C handler; commands poll it between steps.
pub fn install_ctrlc_handler() -> CliResult<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))?;
    Ok(running)
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert_eq!(parse_duration("0s").unwrap_err().code, USAGE);
        assert_eq!(parse_duration("bad").unwrap_err().code, USAGE);
        assert_eq!(parse_duration("  ").unwrap_err().code, USAGE);
    }
}
