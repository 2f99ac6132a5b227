//! Fixed control frames.
//!
//! These carry no payload beyond their three-letter body and, except for
//! `[ver]`, are never answered.

use crate::codec::{Motor, RawFrame, FRAME_END, FRAME_START};

/// Enable all motors.
pub const ENABLE_ALL: RawFrame = *b"[ena]";

/// Persist parameters to non-volatile memory.
pub const SAVE: RawFrame = *b"[sav]";

/// Request the firmware version; answered by a single-value frame tagged `v`.
pub const VERSION: RawFrame = *b"[ver]";

/// Tag of the version reply.
pub const VERSION_TAG: u8 = b'v';

/// Stop continuous feedback started by [`feedback_on`].
pub const FEEDBACK_OFF: RawFrame = *b"[mo0]";

/// Start continuous position and PWM/status feedback for `motor` (every ~15 ms).
pub fn feedback_on(motor: Motor) -> RawFrame {
    [FRAME_START, b'm', b'o', b'0' + motor.ordinal(), FRAME_END]
}

/// Enable a single motor.
pub fn enable_motor(motor: Motor) -> RawFrame {
    [FRAME_START, b'e', b'n', b'0' + motor.ordinal(), FRAME_END]
}

/// Returns a human-readable name for an outbound frame.
pub fn control_name(frame: &[u8]) -> &'static str {
    match frame {
        b"[ena]" => "ENABLE_ALL",
        b"[sav]" => "SAVE",
        b"[ver]" => "VERSION",
        b"[mo0]" => "FEEDBACK_OFF",
        b"[mo1]" | b"[mo2]" | b"[mo3]" => "FEEDBACK_ON",
        b"[en1]" | b"[en2]" | b"[en3]" => "ENABLE_MOTOR",
        [FRAME_START, b'r', b'd', _, FRAME_END] => "READ",
        _ => "WRITE",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_frames_address_each_motor() {
        assert_eq!(&feedback_on(Motor::A), b"[mo1]");
        assert_eq!(&feedback_on(Motor::B), b"[mo2]");
        assert_eq!(&feedback_on(Motor::C), b"[mo3]");
        assert_eq!(&enable_motor(Motor::C), b"[en3]");
    }

    #[test]
    fn names_outbound_frames() {
        assert_eq!(control_name(&VERSION), "VERSION");
        assert_eq!(control_name(&feedback_on(Motor::B)), "FEEDBACK_ON");
        assert_eq!(control_name(b"[rdD]"), "READ");
        assert_eq!(control_name(b"[A\x02\x00]"), "WRITE");
    }
}
