use std::fmt;
use std::str::FromStr;

use bytes::BytesMut;

use crate::error::{FrameError, Result};

/// Every frame on the wire is exactly five bytes.
pub const FRAME_LEN: usize = 5;

/// Opening frame delimiter.
pub const FRAME_START: u8 = b'[';

/// Closing frame delimiter.
pub const FRAME_END: u8 = b']';

/// An encoded frame.
pub type RawFrame = [u8; FRAME_LEN];

/// Base of the uppercase (settings) code group.
const UPPER_GROUP_BASE: u8 = b'A';

/// Base of the lowercase (feedback) code group.
const LOWER_GROUP_BASE: u8 = b'a';

/// Consecutive codes per parameter, one per motor.
const GROUP_WIDTH: i16 = 3;

/// One of the three motor channels of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Motor {
    A,
    B,
    C,
}

impl Motor {
    /// All motors in ordinal order.
    pub const ALL: [Motor; 3] = [Motor::A, Motor::B, Motor::C];

    /// 1-based motor number used on the wire.
    pub fn ordinal(self) -> u8 {
        match self {
            Motor::A => 1,
            Motor::B => 2,
            Motor::C => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Motor::A => "A",
            Motor::B => "B",
            Motor::C => "C",
        }
    }
}

impl fmt::Display for Motor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Motor {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" | "1" => Ok(Motor::A),
            "B" | "2" => Ok(Motor::B),
            "C" | "3" => Ok(Motor::C),
            other => Err(format!("unknown motor '{other}' (expected A, B or C)")),
        }
    }
}

/// Controller attributes addressable over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    /// Target position; replies carry target and feedback.
    Position,
    /// Proportional gain.
    Kp,
    /// Integral gain.
    Ki,
    /// Derivative gain.
    Kd,
    /// Derivative smoothing.
    Ks,
    /// PWM minimum and maximum.
    PwmMinMax,
    /// Motor and input min/max limits.
    MinMax,
    /// Feedback dead zone and PWM reverse duty.
    FeedbackDeadZone,
    /// PWM output and status byte (feedback group, read-only).
    PwmStatus,
    /// Firmware version multiplied by 100 (read-only).
    Version,
}

impl Parameter {
    pub const ALL: [Parameter; 10] = [
        Parameter::Position,
        Parameter::Kp,
        Parameter::Ki,
        Parameter::Kd,
        Parameter::Ks,
        Parameter::PwmMinMax,
        Parameter::MinMax,
        Parameter::FeedbackDeadZone,
        Parameter::PwmStatus,
        Parameter::Version,
    ];

    /// Base code character; motor A uses it directly, B and C the next two.
    pub fn code(self) -> u8 {
        match self {
            Parameter::Position => b'A',
            Parameter::Kp => b'D',
            Parameter::Ki => b'G',
            Parameter::Kd => b'J',
            Parameter::Ks => b'M',
            Parameter::PwmMinMax => b'P',
            Parameter::MinMax => b'S',
            Parameter::FeedbackDeadZone => b'V',
            Parameter::PwmStatus => b'a',
            Parameter::Version => b'v',
        }
    }

    /// Look up a parameter by its base code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|param| param.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            Parameter::Position => "Position",
            Parameter::Kp => "Kp",
            Parameter::Ki => "Ki",
            Parameter::Kd => "Kd",
            Parameter::Ks => "Ks",
            Parameter::PwmMinMax => "PWMinMax",
            Parameter::MinMax => "MinMax",
            Parameter::FeedbackDeadZone => "FBDeadZone",
            Parameter::PwmStatus => "PwmStatus",
            Parameter::Version => "Version",
        }
    }

    /// Whether `{code, code+1, code+2}` address motors A, B and C.
    pub fn is_motor_indexed(self) -> bool {
        !matches!(self, Parameter::Version)
    }

    pub fn is_read_only(self) -> bool {
        matches!(self, Parameter::PwmStatus | Parameter::Version)
    }

    /// Number of values a set command takes.
    pub fn arity(self) -> usize {
        match self {
            Parameter::PwmMinMax | Parameter::MinMax | Parameter::FeedbackDeadZone => 2,
            _ => 1,
        }
    }

    /// Inclusive bound applied to every set-command value.
    ///
    /// Two-value parameters are carried one byte per value.
    pub fn limits(self) -> Option<(u16, u16)> {
        if self.arity() == 2 {
            return Some((0, u16::from(u8::MAX)));
        }
        match self {
            Parameter::Position => Some((0, 1024)),
            Parameter::Kp | Parameter::Ki | Parameter::Kd => Some((0, 1000)),
            Parameter::Ks => Some((1, 20)),
            _ => None,
        }
    }

    /// Number of values carried by a reply frame.
    pub fn value_count(self) -> usize {
        match self {
            Parameter::Position
            | Parameter::PwmStatus
            | Parameter::MinMax
            | Parameter::PwmMinMax
            | Parameter::FeedbackDeadZone => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Parameter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|param| param.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown parameter '{wanted}'"))
    }
}

/// Parameter decoded from a code byte.
///
/// Decoding never fails: codes outside the known set are carried verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamCode {
    Known(Parameter),
    Unrecognized(u8),
}

impl ParamCode {
    pub fn code(self) -> u8 {
        match self {
            ParamCode::Known(param) => param.code(),
            ParamCode::Unrecognized(code) => code,
        }
    }

    /// Values carried by a reply for this code. Unknown codes carry one.
    pub fn value_count(self) -> usize {
        match self {
            ParamCode::Known(param) => param.value_count(),
            ParamCode::Unrecognized(_) => 1,
        }
    }
}

impl From<Parameter> for ParamCode {
    fn from(param: Parameter) -> Self {
        ParamCode::Known(param)
    }
}

impl fmt::Display for ParamCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamCode::Known(param) => f.write_str(param.name()),
            ParamCode::Unrecognized(code) => {
                write!(f, "Unknown({})", std::ascii::escape_default(*code))
            }
        }
    }
}

/// Decoded payload of a reply or write frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Values {
    /// One big-endian 16-bit value.
    Single(u16),
    /// Two independent bytes.
    Pair(u8, u8),
}

impl Values {
    /// The value as one number; a pair reads as its big-endian combination.
    pub fn as_u16(self) -> u16 {
        match self {
            Values::Single(value) => value,
            Values::Pair(hi, lo) => u16::from_be_bytes([hi, lo]),
        }
    }

    /// The value as two numbers; a single value reads as `(value, 0)`.
    pub fn as_pair(self) -> (u16, u16) {
        match self {
            Values::Pair(first, second) => (u16::from(first), u16::from(second)),
            Values::Single(value) => (value, 0),
        }
    }

    pub fn to_vec(self) -> Vec<u16> {
        match self {
            Values::Single(value) => vec![value],
            Values::Pair(first, second) => vec![u16::from(first), u16::from(second)],
        }
    }
}

impl fmt::Display for Values {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Values::Single(value) => write!(f, "{value}"),
            Values::Pair(first, second) => write!(f, "{first} {second}"),
        }
    }
}

/// A decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    /// The raw code byte; a pending read waits on this exact tag.
    pub tag: u8,
    pub motor: Motor,
    pub param: ParamCode,
    pub values: Values,
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' motor {} {} [{}]",
            std::ascii::escape_default(self.tag),
            self.motor,
            self.param,
            self.values
        )
    }
}

/// Code byte addressing `param` on `motor`.
///
/// Only meaningful for parameters where [`Parameter::is_motor_indexed`] holds.
pub fn param_to_char(motor: Motor, param: Parameter) -> u8 {
    param.code() + motor.ordinal() - 1
}

/// Split a code byte into its motor and parameter.
pub fn byte_to_param(byte: u8) -> (Motor, ParamCode) {
    let base = if byte >= LOWER_GROUP_BASE {
        LOWER_GROUP_BASE
    } else {
        UPPER_GROUP_BASE
    };
    let offset = i16::from(byte) - i16::from(base);

    let motor = match offset.rem_euclid(GROUP_WIDTH) {
        0 => Motor::A,
        1 => Motor::B,
        _ => Motor::C,
    };

    // Bytes below 'A' can land on a group base that is not a byte at all.
    let group = i16::from(base) + offset.div_euclid(GROUP_WIDTH) * GROUP_WIDTH;
    let param = match u8::try_from(group) {
        Ok(code) => Parameter::from_code(code)
            .map(ParamCode::Known)
            .unwrap_or(ParamCode::Unrecognized(code)),
        Err(_) => ParamCode::Unrecognized(byte),
    };

    (motor, param)
}

/// `[rd<code>]` read request for an arbitrary code byte.
pub fn read_request(code: u8) -> RawFrame {
    [FRAME_START, b'r', b'd', code, FRAME_END]
}

/// `[rd<code>]` read request for `param` on `motor`.
pub fn read_command(motor: Motor, param: Parameter) -> RawFrame {
    read_request(param_to_char(motor, param))
}

/// Validated write frame for `param` on `motor`.
pub fn set_command(motor: Motor, param: Parameter, args: &[u16]) -> Result<RawFrame> {
    if param.is_read_only() {
        return Err(FrameError::ReadOnly(param.into()));
    }

    let expected = param.arity();
    if args.len() != expected {
        return Err(FrameError::InvalidArgumentCount {
            param: param.into(),
            got: args.len(),
            expected,
        });
    }

    if let Some((min, max)) = param.limits() {
        if let Some(&value) = args.iter().find(|&&value| value < min || max < value) {
            return Err(FrameError::OutOfRange {
                param: param.into(),
                value,
                min,
                max,
            });
        }
    }

    format_value(param_to_char(motor, param), args)
}

/// Encode one value (big-endian `u16`) or two values (one byte each).
///
/// No parameter bounds are checked here; see [`set_command`].
pub fn format_value(code: u8, args: &[u16]) -> Result<RawFrame> {
    match *args {
        [value] => {
            let [hi, lo] = value.to_be_bytes();
            Ok([FRAME_START, code, hi, lo, FRAME_END])
        }
        [first, second] => {
            let first = u8::try_from(first).map_err(|_| FrameError::ByteOverflow(first))?;
            let second = u8::try_from(second).map_err(|_| FrameError::ByteOverflow(second))?;
            Ok([FRAME_START, code, first, second, FRAME_END])
        }
        _ => Err(FrameError::InvalidValueCount(args.len())),
    }
}

/// Decode one complete frame.
///
/// The delimiters are not checked; only the width is.
pub fn parse_packet(frame: &[u8]) -> Result<Packet> {
    if frame.len() != FRAME_LEN {
        return Err(FrameError::InvalidFrameSize(frame.len()));
    }

    let tag = frame[1];
    let (motor, param) = byte_to_param(tag);
    let values = match param.value_count() {
        1 => Values::Single(u16::from_be_bytes([frame[2], frame[3]])),
        2 => Values::Pair(frame[2], frame[3]),
        count => return Err(FrameError::UnsupportedValueCount { param, count }),
    };

    Ok(Packet {
        tag,
        motor,
        param,
        values,
    })
}

/// Decode a packet from the front of a buffer.
///
/// Returns `Ok(None)` if fewer than five bytes are buffered.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_packet(src: &mut BytesMut) -> Result<Option<Packet>> {
    if src.len() < FRAME_LEN {
        return Ok(None); // Need more data
    }

    let frame = src.split_to(FRAME_LEN);
    parse_packet(&frame).map(Some)
}
