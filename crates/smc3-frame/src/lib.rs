//! Fixed-width frame codec for the SMC3 serial protocol.
//!
//! Every unit on the wire is exactly five bytes:
//! - `[` opening bracket
//! - one code byte addressing motor and parameter (group-of-3 addressing)
//! - two payload bytes (one big-endian `u16`, or two independent `u8`)
//! - `]` closing bracket
//!
//! Read requests reuse the same width: `[rd<code>]`.

pub mod codec;
pub mod control;
pub mod error;
pub mod framer;
pub mod reader;
pub mod writer;

pub use codec::{
    byte_to_param, decode_packet, format_value, param_to_char, parse_packet, read_command,
    read_request, set_command, Motor, Packet, ParamCode, Parameter, RawFrame, Values, FRAME_LEN,
};
pub use control::{
    control_name, enable_motor, feedback_on, ENABLE_ALL, FEEDBACK_OFF, SAVE, VERSION, VERSION_TAG,
};
pub use error::{FrameError, Result};
pub use framer::Framer;
pub use reader::{is_timeout, PacketReader, DEFAULT_READ_CHUNK};
pub use writer::FrameWriter;
