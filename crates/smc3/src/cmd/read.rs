use crate::cmd::{connect, ReadArgs, Session};
use crate::exit::{client_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_packet, OutputFormat};

pub async fn run(args: ReadArgs, session: &Session, format: OutputFormat) -> CliResult<i32> {
    let code = parse_code(&args.code)?;
    let controller = connect(&args.device, session, ())?;

    let packet = controller
        .read_raw(code)
        .await
        .map_err(|err| client_error("read failed", err))?;

    print_packet(&packet, format);
    Ok(SUCCESS)
}

/// Codes are a single ASCII character on the wire.
fn parse_code(input: &str) -> CliResult<u8> {
    match input.as_bytes() {
        [code] if code.is_ascii_graphic() => Ok(*code),
        _ => Err(CliError::new(
            USAGE,
            format!("parameter code must be a single character, got '{input}'"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_characters_are_codes() {
        assert_eq!(parse_code("D").unwrap(), b'D');
        assert_eq!(parse_code("v").unwrap(), b'v');
    }

    #[test]
    fn other_inputs_are_usage_errors() {
        assert_eq!(parse_code("").unwrap_err().code, USAGE);
        assert_eq!(parse_code("Kp").unwrap_err().code, USAGE);
        assert_eq!(parse_code(" ").unwrap_err().code, USAGE);
        assert_eq!(parse_code("é").unwrap_err().code, USAGE);
    }
}
