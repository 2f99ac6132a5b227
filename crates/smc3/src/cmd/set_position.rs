use tracing::info;

use crate::cmd::{connect, parse_duration, SetPositionArgs, Session};
use crate::exit::{client_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_position, version_string, OutputFormat};

/// Highest position the controller accepts.
const MAX_POSITION: u16 = 1024;

pub async fn run(
    args: SetPositionArgs,
    session: &Session,
    format: OutputFormat,
) -> CliResult<i32> {
    if args.position > MAX_POSITION {
        return Err(CliError::new(
            USAGE,
            format!(
                "invalid motor position {} (expected 0-{MAX_POSITION})",
                args.position
            ),
        ));
    }
    let hold = parse_duration(&args.hold)?;

    let controller = connect(&args.device, session, ())?;
    let version = controller
        .version()
        .await
        .map_err(|err| client_error("version read failed", err))?;
    info!(version = %version_string(version), "controller ready");

    controller
        .enable_feedback(args.motor)
        .map_err(|err| client_error("enable feedback failed", err))?;

    let moved = controller
        .set_position(args.motor, args.position)
        .map_err(|err| client_error("set position failed", err));
    if moved.is_ok() {
        tokio::time::sleep(hold).await;
    }

    // Feedback goes off even when the move failed.
    let stopped = controller
        .disable_feedback()
        .map_err(|err| client_error("disable feedback failed", err));

    moved?;
    stopped?;
    print_position(args.motor, args.position, format);
    Ok(SUCCESS)
}
