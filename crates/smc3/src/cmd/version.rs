use crate::cmd::{connect, DeviceArgs, Session};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_version, OutputFormat};

pub async fn run(args: DeviceArgs, session: &Session, format: OutputFormat) -> CliResult<i32> {
    let controller = connect(&args.device, session, ())?;
    let raw = controller
        .version()
        .await
        .map_err(|err| client_error("version read failed", err))?;

    print_version(&args.device, raw, format);
    Ok(SUCCESS)
}
