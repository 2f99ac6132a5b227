use crate::cmd::MockArgs;
use crate::exit::CliResult;
use crate::output::OutputFormat;

#[cfg(unix)]
pub fn run(args: MockArgs, format: OutputFormat) -> CliResult<i32> {
    use std::io;
    use std::sync::atomic::Ordering;

    use smc3_mock::{idle_telemetry, smc3_device, MockConfig, MockEndpoint, MockError};
    use tracing::{debug, info, warn};

    use crate::cmd::{install_ctrlc_handler, parse_duration};
    use crate::exit::{mock_error, SUCCESS};
    use crate::output::print_mock_port;

    let interval = parse_duration(&args.interval)?;
    let running = install_ctrlc_handler()?;

    let config = MockConfig::default().with_span(tracing::info_span!("mock"));
    let mut endpoint =
        MockEndpoint::pty_with_config(config).map_err(|err| mock_error("pty setup failed", err))?;
    let stubs = smc3_device(args.firmware_version)
        .map_err(|err| mock_error("stub setup failed", err))?;
    for (name, stub) in stubs {
        endpoint.stub(name, stub);
    }
    let telemetry = idle_telemetry().map_err(|err| mock_error("telemetry setup failed", err))?;
    endpoint
        .open()
        .map_err(|err| mock_error("mock open failed", err))?;

    let port = endpoint.port_name().unwrap_or_default().to_string();
    print_mock_port(&port, endpoint.stub_count(), format);
    info!(%port, version = args.firmware_version, "serving mock controller");

    while running.load(Ordering::SeqCst) {
        match endpoint.send(&telemetry) {
            Ok(()) => {}
            // Nobody drains the terminal; the burst is dropped.
            Err(MockError::Io(err)) if err.kind() == io::ErrorKind::TimedOut => {
                debug!("telemetry not consumed");
            }
            Err(err) => {
                warn!(error = %err, "telemetry send failed");
                break;
            }
        }
        std::thread::sleep(interval);
    }

    endpoint.close();
    Ok(SUCCESS)
}

#[cfg(not(unix))]
pub fn run(_args: MockArgs, _format: OutputFormat) -> CliResult<i32> {
    Err(crate::exit::CliError::new(
        crate::exit::TRANSPORT_ERROR,
        "mock devices need pseudo-terminal support",
    ))
}
