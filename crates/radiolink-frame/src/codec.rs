use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};
use crate::frame::{Frame, HEADER_SIZE, MAX_FRAME_SIZE, MAX_LENGTH, MIN_LENGTH};

/// Encode a frame into its over-the-air bytes.
///
/// Wire format:
/// ```text
/// ┌────────┬─────────┬───────┬──────────┬──────────────────┐
/// │ Length │ Version │ Group │ Protocol │ Payload          │
/// │ (1B)   │ (1B)    │ (1B)  │ (1B)     │ (Length-3 bytes) │
/// └────────┴─────────┴───────┴──────────┴──────────────────┘
/// ```
/// Length counts every byte after itself. The RSSI is never encoded.
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    if !frame.is_well_formed() {
        return Err(FrameError::LengthOutOfRange {
            length: usize::from(frame.length()),
            max: usize::from(MAX_LENGTH),
        });
    }
    let wire = frame.wire_bytes();
    dst.reserve(wire.len());
    dst.put_slice(wire);
    Ok(())
}

/// Decode a frame from over-the-air bytes.
///
/// Trailing bytes beyond the length field are ignored. The RSSI of the
/// returned frame is zero.
pub fn decode_frame(src: &[u8]) -> Result<Frame> {
    if src.len() < HEADER_SIZE {
        return Err(FrameError::Truncated {
            needed: HEADER_SIZE,
            available: src.len(),
        });
    }

    let length = src[0];
    if !(MIN_LENGTH..=MAX_LENGTH).contains(&length) {
        return Err(FrameError::LengthOutOfRange {
            length: usize::from(length),
            max: usize::from(MAX_LENGTH),
        });
    }

    let total = 1 + usize::from(length);
    if src.len() < total {
        return Err(FrameError::Truncated {
            needed: total,
            available: src.len(),
        });
    }

    let mut frame = Frame::default();
    frame.as_bytes_mut()[..total].copy_from_slice(&src[..total]);
    Ok(frame)
}

/// Check a frame a radio has just received into, given the PDU byte count
/// the radio reported.
///
/// The length field must describe a complete header, fit in the frame
/// buffer, and be covered by the bytes actually received.
pub fn check_received(frame: &Frame, received: usize) -> Result<()> {
    if received < HEADER_SIZE {
        return Err(FrameError::Truncated {
            needed: HEADER_SIZE,
            available: received,
        });
    }
    if received > MAX_FRAME_SIZE || !frame.is_well_formed() {
        return Err(FrameError::LengthOutOfRange {
            length: received.max(usize::from(frame.length()) + 1) - 1,
            max: usize::from(MAX_LENGTH),
        });
    }
    if frame.wire_size() > received {
        return Err(FrameError::Truncated {
            needed: frame.wire_size(),
            available: received,
        });
    }
    Ok(())
}
