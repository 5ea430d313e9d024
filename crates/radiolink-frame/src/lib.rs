//! Fixed-layout radio frames and the datagram protocol.
//!
//! Every frame on the air is at most 36 bytes:
//! - a 4-byte header (length, version, group, protocol)
//! - up to 32 bytes of payload
//!
//! The receive path writes straight into a [`Frame`]; nothing here allocates.

pub mod codec;
pub mod datagram;
pub mod error;
pub mod frame;

pub use codec::{check_received, decode_frame, encode_frame};
pub use datagram::{decode_message, encode_message, Message, MessageKind, Number, Text};
pub use error::{FrameError, Result};
pub use frame::{
    Frame, FRAME_VERSION, HEADER_SIZE, MAX_FRAME_SIZE, MAX_LENGTH, MAX_PAYLOAD_SIZE,
    PROTOCOL_DATAGRAM,
};
