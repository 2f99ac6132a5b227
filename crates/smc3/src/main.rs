mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;
use smc3_transport::DEFAULT_BAUD_RATE;

use crate::cmd::{parse_duration, Command, Session};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "smc3", version, about = "SMC3 motion controller CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// UART baud rate.
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE, global = true)]
    baud_rate: u32,

    /// How long to wait for each reply (e.g. 1s, 250ms).
    #[arg(long, value_name = "DURATION", default_value = "1s", global = true)]
    timeout: String,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = parse_duration(&cli.timeout).and_then(|timeout| {
        let session = Session {
            baud_rate: cli.baud_rate,
            timeout,
        };
        cmd::run(cli.command, &session, format)
    });

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use smc3_frame::Motor;

    use super::*;
    use crate::cmd::WavePattern;

    #[test]
    fn parses_read_subcommand() {
        let cli = Cli::try_parse_from(["smc3", "read", "/dev/ttyUSB0", "D"])
            .expect("read args should parse");

        match cli.command {
            Command::Read(args) => {
                assert_eq!(args.device, "/dev/ttyUSB0");
                assert_eq!(args.code, "D");
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.baud_rate, 500_000);
        assert_eq!(cli.timeout, "1s");
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "smc3",
            "status",
            "/dev/ttyUSB0",
            "-b",
            "115200",
            "--timeout",
            "250ms",
            "--format",
            "json",
        ])
        .expect("status args should parse");

        assert!(matches!(cli.command, Command::Status(_)));
        assert_eq!(cli.baud_rate, 115_200);
        assert_eq!(cli.timeout, "250ms");
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
    }

    #[test]
    fn parses_set_position_with_motor_and_hold() {
        let cli = Cli::try_parse_from([
            "smc3",
            "set-position",
            "/dev/ttyUSB0",
            "b",
            "768",
            "--hold",
            "500ms",
        ])
        .expect("set-position args should parse");

        match cli.command {
            Command::SetPosition(args) => {
                assert_eq!(args.motor, Motor::B);
                assert_eq!(args.position, 768);
                assert_eq!(args.hold, "500ms");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_motor() {
        let err = Cli::try_parse_from(["smc3", "watch", "/dev/ttyUSB0", "D"])
            .expect_err("motor D does not exist");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_wave_defaults() {
        let cli = Cli::try_parse_from([
            "smc3",
            "wave",
            "/dev/ttyUSB0",
            "--pattern",
            "three-phase",
        ])
        .expect("wave args should parse");

        match cli.command {
            Command::Wave(args) => {
                assert_eq!(args.pattern, WavePattern::ThreePhase);
                assert_eq!(args.motor, Motor::A);
                assert_eq!(args.scale, 1.0);
                assert!(!args.sideways);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn mock_needs_no_device() {
        let cli = Cli::try_parse_from(["smc3", "mock", "--firmware-version", "250"])
            .expect("mock args should parse");
        match cli.command {
            Command::Mock(args) => {
                assert_eq!(args.firmware_version, 250);
                assert_eq!(args.interval, "100ms");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
