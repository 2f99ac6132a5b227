//! Stub set of a healthy SMC3 controller.

use smc3_frame::{
    enable_motor, feedback_on, format_value, param_to_char, read_command, set_command, Motor,
    Parameter, ENABLE_ALL, FEEDBACK_OFF, SAVE, VERSION, VERSION_TAG,
};

use crate::error::Result;
use crate::stub::Stub;

/// Highest position a write can carry.
const MAX_POSITION: u16 = 1024;

/// Single-value gains reported for every motor.
const GAINS: [(Parameter, u16); 4] = [
    (Parameter::Kp, 400),
    (Parameter::Ki, 150),
    (Parameter::Kd, 1200),
    (Parameter::Ks, 10),
];

/// Byte-pair limits reported for every motor.
const LIMITS: [(Parameter, u16, u16); 3] = [
    (Parameter::MinMax, 20, 235),
    (Parameter::PwmMinMax, 40, 255),
    (Parameter::FeedbackDeadZone, 0, 2),
];

/// Named stubs answering like a controller reporting `version`.
///
/// Covers the version query, every read the status display issues, every
/// position write, zeroed PWM writes and the control frames. Writes and
/// control frames are consumed without a reply.
pub fn smc3_device(version: u16) -> Result<Vec<(String, Stub)>> {
    let mut stubs = vec![
        (
            "version".to_string(),
            Stub::fixed(VERSION, format_value(VERSION_TAG, &[version])?),
        ),
        ("enable all".to_string(), Stub::silent(ENABLE_ALL)),
        ("save".to_string(), Stub::silent(SAVE)),
        ("feedback off".to_string(), Stub::silent(FEEDBACK_OFF)),
    ];

    for motor in Motor::ALL {
        let position = param_to_char(motor, Parameter::Position);
        let pwm = param_to_char(motor, Parameter::PwmStatus);

        stubs.push((
            format!("Motor {motor} target and feedback"),
            Stub::fixed(
                read_command(motor, Parameter::Position),
                format_value(position, &[100, 10])?,
            ),
        ));
        stubs.push((
            format!("Motor {motor} pwm and status"),
            Stub::fixed(
                read_command(motor, Parameter::PwmStatus),
                format_value(pwm, &[200, 13])?,
            ),
        ));

        for (param, value) in GAINS {
            stubs.push((
                format!("Motor {motor} {param}"),
                Stub::fixed(
                    read_command(motor, param),
                    format_value(param_to_char(motor, param), &[value])?,
                ),
            ));
        }
        for (param, low, high) in LIMITS {
            stubs.push((
                format!("Motor {motor} {param}"),
                Stub::fixed(
                    read_command(motor, param),
                    format_value(param_to_char(motor, param), &[low, high])?,
                ),
            ));
        }

        for target in 0..=MAX_POSITION {
            stubs.push((
                format!("Motor {motor} position command {target}"),
                Stub::silent(set_command(motor, Parameter::Position, &[target])?),
            ));
        }
        stubs.push((
            format!("Motor {motor} pwm command"),
            Stub::silent(format_value(pwm, &[0, 0])?),
        ));

        stubs.push((
            format!("Motor {motor} feedback on"),
            Stub::silent(feedback_on(motor)),
        ));
        stubs.push((
            format!("Motor {motor} enable"),
            Stub::silent(enable_motor(motor)),
        ));
    }

    Ok(stubs)
}

/// Zeroed position and PWM/status frames for every motor.
pub fn idle_telemetry() -> Result<Vec<u8>> {
    let mut frames = Vec::new();
    for param in [Parameter::Position, Parameter::PwmStatus] {
        for motor in Motor::ALL {
            frames.extend_from_slice(&format_value(param_to_char(motor, param), &[0, 0])?);
        }
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;
    use crate::endpoint::match_and_reply;
    use crate::stub::StubHandle;

    fn device() -> Vec<StubHandle> {
        smc3_device(101)
            .unwrap()
            .into_iter()
            .map(|(_, stub)| Arc::new(stub))
            .collect()
    }

    #[test]
    fn names_are_unique() {
        let stubs = smc3_device(101).unwrap();
        let names: HashSet<&str> = stubs.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names.len(), stubs.len());
    }

    #[test]
    fn no_prefix_overlaps_another() {
        let mut prefixes: Vec<Vec<u8>> = device()
            .iter()
            .map(|stub| stub.prefix().to_vec())
            .collect();
        prefixes.sort();
        for pair in prefixes.windows(2) {
            assert!(
                !pair[1].starts_with(&pair[0]),
                "{} overlaps {}",
                pair[0].escape_ascii(),
                pair[1].escape_ascii()
            );
        }
    }

    #[test]
    fn answers_status_reads() {
        let stubs = device();
        let mut sink = Vec::new();

        let consumed =
            match_and_reply(&stubs, b"[ver][rdB][rdb][rdE][rdT]", &mut sink).unwrap();

        assert_eq!(consumed, 25);
        assert_eq!(
            sink,
            b"[v\x00\x65][B\x64\x0a][b\xc8\x0d][E\x01\x90][T\x14\xeb]"
        );
    }

    #[test]
    fn accepts_writes_silently() {
        let stubs = device();
        let mut sink = Vec::new();
        let wire = b"[mo1][A\x02\x00][C\x04\x00][mo0][ena][en2][sav][a\x00\x00]";

        let consumed = match_and_reply(&stubs, wire, &mut sink).unwrap();

        assert_eq!(consumed, wire.len());
        assert!(sink.is_empty());
    }

    #[test]
    fn idle_telemetry_covers_all_motors() {
        assert_eq!(
            idle_telemetry().unwrap(),
            b"[A\x00\x00][B\x00\x00][C\x00\x00][a\x00\x00][b\x00\x00][c\x00\x00]"
        );
    }
}
