//! Datagram payload encodings.
//!
//! The first payload byte is a type tag selecting one of five shapes:
//!
//! ```text
//! tag 0  int           [0][i32]
//! tag 1  keyed int     [1][i32][len][key bytes]
//! tag 2  string        [2][len][bytes]
//! tag 4  double        [4][f64]
//! tag 5  keyed double  [5][f64][len][key bytes]
//! ```
//!
//! Numbers are stored in the sender's native width and byte order (`i32` is
//! 4 bytes, `f64` is 8). Both ends are assumed to share that layout; the wire
//! carries nothing that would let a receiver detect a mismatch. Strings are a
//! length byte followed by that many raw bytes, with no terminator and no
//! guarantee of UTF-8.

use std::borrow::Cow;
use std::fmt;

use bytes::{Buf, BufMut};
use serde::Serialize;

use crate::error::{FrameError, Result};
use crate::frame::{Frame, FRAME_VERSION, MAX_PAYLOAD_SIZE, PROTOCOL_DATAGRAM};

/// Type tag values.
pub mod tag {
    pub const INT: u8 = 0;
    pub const KEYED_INT: u8 = 1;
    pub const STRING: u8 = 2;
    pub const DOUBLE: u8 = 4;
    pub const KEYED_DOUBLE: u8 = 5;
}

const INT_WIDTH: usize = std::mem::size_of::<i32>();
const DOUBLE_WIDTH: usize = std::mem::size_of::<f64>();

/// The five datagram payload shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Int,
    KeyedInt,
    String,
    Double,
    KeyedDouble,
}

impl MessageKind {
    /// Every kind, in tag order.
    pub const ALL: [MessageKind; 5] = [
        MessageKind::Int,
        MessageKind::KeyedInt,
        MessageKind::String,
        MessageKind::Double,
        MessageKind::KeyedDouble,
    ];

    /// Wire tag of this kind.
    pub fn tag(self) -> u8 {
        match self {
            MessageKind::Int => tag::INT,
            MessageKind::KeyedInt => tag::KEYED_INT,
            MessageKind::String => tag::STRING,
            MessageKind::Double => tag::DOUBLE,
            MessageKind::KeyedDouble => tag::KEYED_DOUBLE,
        }
    }

    /// Kind for a wire tag, if recognized.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            tag::INT => Some(MessageKind::Int),
            tag::KEYED_INT => Some(MessageKind::KeyedInt),
            tag::STRING => Some(MessageKind::String),
            tag::DOUBLE => Some(MessageKind::Double),
            tag::KEYED_DOUBLE => Some(MessageKind::KeyedDouble),
            _ => None,
        }
    }

    /// Dense index, `0..5`, for table lookups.
    pub fn index(self) -> usize {
        match self {
            MessageKind::Int => 0,
            MessageKind::KeyedInt => 1,
            MessageKind::String => 2,
            MessageKind::Double => 3,
            MessageKind::KeyedDouble => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageKind::Int => "int",
            MessageKind::KeyedInt => "keyed_int",
            MessageKind::String => "string",
            MessageKind::Double => "double",
            MessageKind::KeyedDouble => "keyed_double",
        }
    }
}

/// A number that can be sent on its own or under a key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i32),
    Double(f64),
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Number::Int(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Double(value)
    }
}

/// Raw string bytes borrowed from a frame.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Text<'a>(&'a [u8]);

impl<'a> Text<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.0
    }

    /// The text if it is valid UTF-8.
    pub fn to_str(&self) -> Option<&'a str> {
        std::str::from_utf8(self.0).ok()
    }

    /// The text with invalid sequences replaced; borrows when already valid.
    pub fn to_str_lossy(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> From<&'a str> for Text<'a> {
    fn from(value: &'a str) -> Self {
        Self(value.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for Text<'a> {
    fn from(value: &'a [u8]) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Text<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.to_str_lossy(), f)
    }
}

impl fmt::Display for Text<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_str_lossy())
    }
}

impl Serialize for Text<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_str_lossy())
    }
}

/// A decoded datagram. String fields borrow from the frame they came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message<'a> {
    Int { value: i32 },
    KeyedInt { key: Text<'a>, value: i32 },
    String { text: Text<'a> },
    Double { value: f64 },
    KeyedDouble { key: Text<'a>, value: f64 },
}

impl<'a> Message<'a> {
    /// A plain number message.
    pub fn number(value: impl Into<Number>) -> Self {
        match value.into() {
            Number::Int(value) => Message::Int { value },
            Number::Double(value) => Message::Double { value },
        }
    }

    /// A keyed number message.
    pub fn keyed(key: impl Into<Text<'a>>, value: impl Into<Number>) -> Self {
        let key = key.into();
        match value.into() {
            Number::Int(value) => Message::KeyedInt { key, value },
            Number::Double(value) => Message::KeyedDouble { key, value },
        }
    }

    /// A string message.
    pub fn string(text: impl Into<Text<'a>>) -> Self {
        Message::String { text: text.into() }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Int { .. } => MessageKind::Int,
            Message::KeyedInt { .. } => MessageKind::KeyedInt,
            Message::String { .. } => MessageKind::String,
            Message::Double { .. } => MessageKind::Double,
            Message::KeyedDouble { .. } => MessageKind::KeyedDouble,
        }
    }

    /// Bytes this message occupies in a payload, tag included.
    pub fn encoded_len(&self) -> usize {
        1 + match self {
            Message::Int { .. } => INT_WIDTH,
            Message::Double { .. } => DOUBLE_WIDTH,
            Message::String { text } => 1 + text.len(),
            Message::KeyedInt { key, .. } => INT_WIDTH + 1 + key.len(),
            Message::KeyedDouble { key, .. } => DOUBLE_WIDTH + 1 + key.len(),
        }
    }
}

/// Write `message` as the payload of `frame` and set its length field.
///
/// Only the payload and length are touched; the caller owns the rest of the
/// header.
pub fn encode_message(frame: &mut Frame, message: &Message<'_>) -> Result<()> {
    let size = message.encoded_len();
    if size > MAX_PAYLOAD_SIZE {
        return Err(FrameError::PayloadTooLarge {
            size,
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let mut out = &mut frame.payload_mut()[..];
    out.put_u8(message.kind().tag());
    match message {
        Message::Int { value } => out.put_i32_ne(*value),
        Message::Double { value } => out.put_f64_ne(*value),
        Message::String { text } => put_text(&mut out, *text),
        Message::KeyedInt { key, value } => {
            out.put_i32_ne(*value);
            put_text(&mut out, *key);
        }
        Message::KeyedDouble { key, value } => {
            out.put_f64_ne(*value);
            put_text(&mut out, *key);
        }
    }
    frame.set_payload_len(size)
}

/// Interpret the payload of a datagram frame.
///
/// Fails with `UnsupportedProtocol`/`UnsupportedVersion` before looking at the
/// payload, `UnknownTag` for unrecognized tags, and `Truncated` when the used
/// payload is shorter than its shape requires.
pub fn decode_message(frame: &Frame) -> Result<Message<'_>> {
    if frame.protocol() != PROTOCOL_DATAGRAM {
        return Err(FrameError::UnsupportedProtocol(frame.protocol()));
    }
    if frame.version() != FRAME_VERSION {
        return Err(FrameError::UnsupportedVersion(frame.version()));
    }

    let mut src = frame.used_payload();
    ensure(src, 1)?;
    let tag = src.get_u8();
    let kind = MessageKind::from_tag(tag).ok_or(FrameError::UnknownTag(tag))?;

    let message = match kind {
        MessageKind::Int => Message::Int {
            value: get_i32(&mut src)?,
        },
        MessageKind::Double => Message::Double {
            value: get_f64(&mut src)?,
        },
        MessageKind::String => Message::String {
            text: get_text(&mut src)?,
        },
        MessageKind::KeyedInt => {
            let value = get_i32(&mut src)?;
            Message::KeyedInt {
                key: get_text(&mut src)?,
                value,
            }
        }
        MessageKind::KeyedDouble => {
            let value = get_f64(&mut src)?;
            Message::KeyedDouble {
                key: get_text(&mut src)?,
                value,
            }
        }
    };
    Ok(message)
}

fn put_text(out: &mut &mut [u8], text: Text<'_>) {
    // encoded_len() has already bounded the text to the payload size.
    out.put_u8(text.len() as u8);
    out.put_slice(text.as_bytes());
}

fn ensure(src: &[u8], needed: usize) -> Result<()> {
    if src.len() < needed {
        return Err(FrameError::Truncated {
            needed,
            available: src.len(),
        });
    }
    Ok(())
}

fn get_i32(src: &mut &[u8]) -> Result<i32> {
    ensure(src, INT_WIDTH)?;
    Ok(src.get_i32_ne())
}

fn get_f64(src: &mut &[u8]) -> Result<f64> {
    ensure(src, DOUBLE_WIDTH)?;
    Ok(src.get_f64_ne())
}

fn get_text<'a>(src: &mut &'a [u8]) -> Result<Text<'a>> {
    ensure(src, 1)?;
    let len = usize::from(src.get_u8());
    ensure(src, len)?;
    let (text, rest) = src.split_at(len);
    *src = rest;
    Ok(Text::new(text))
}
