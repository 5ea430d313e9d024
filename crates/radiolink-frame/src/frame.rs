use std::fmt;

use crate::error::{FrameError, Result};

/// Header: length (1) + version (1) + group (1) + protocol (1) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// Maximum payload carried by one frame.
pub const MAX_PAYLOAD_SIZE: usize = 32;

/// Maximum bytes on the air for one frame.
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE;

/// Largest valid value of the length byte (everything after it).
pub const MAX_LENGTH: u8 = (MAX_FRAME_SIZE - 1) as u8;

/// Smallest valid value of the length byte: version, group and protocol only.
pub(crate) const MIN_LENGTH: u8 = (HEADER_SIZE - 1) as u8;

/// Wire version stamped on outbound frames.
pub const FRAME_VERSION: u8 = 1;

/// Inner protocol number of the datagram protocol.
pub const PROTOCOL_DATAGRAM: u8 = 1;

const LENGTH: usize = 0;
const VERSION: usize = 1;
const GROUP: usize = 2;
const PROTOCOL: usize = 3;

/// One radio frame.
///
/// The over-the-air bytes are held exactly as they appear on the wire, so a
/// radio can receive directly into [`Frame::as_bytes_mut`]. The received
/// signal strength is attached out of band and is never transmitted.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    raw: [u8; MAX_FRAME_SIZE],
    rssi: i32,
}

impl Frame {
    /// Create an empty datagram frame for `group`.
    pub fn new(group: u8) -> Self {
        let mut frame = Self::default();
        frame.raw[LENGTH] = MIN_LENGTH;
        frame.raw[VERSION] = FRAME_VERSION;
        frame.raw[GROUP] = group;
        frame.raw[PROTOCOL] = PROTOCOL_DATAGRAM;
        frame
    }

    /// Bytes following the length byte: header remainder plus used payload.
    #[inline]
    pub fn length(&self) -> u8 {
        self.raw[LENGTH]
    }

    #[inline]
    pub fn version(&self) -> u8 {
        self.raw[VERSION]
    }

    #[inline]
    pub fn group(&self) -> u8 {
        self.raw[GROUP]
    }

    #[inline]
    pub fn protocol(&self) -> u8 {
        self.raw[PROTOCOL]
    }

    /// Received signal strength in dBm (0 for frames built locally).
    #[inline]
    pub fn rssi(&self) -> i32 {
        self.rssi
    }

    pub fn set_length(&mut self, length: u8) {
        self.raw[LENGTH] = length;
    }

    pub fn set_version(&mut self, version: u8) {
        self.raw[VERSION] = version;
    }

    pub fn set_group(&mut self, group: u8) {
        self.raw[GROUP] = group;
    }

    pub fn set_protocol(&mut self, protocol: u8) {
        self.raw[PROTOCOL] = protocol;
    }

    pub fn set_rssi(&mut self, rssi: i32) {
        self.rssi = rssi;
    }

    /// The full fixed-size payload area.
    pub fn payload(&self) -> &[u8; MAX_PAYLOAD_SIZE] {
        self.raw[HEADER_SIZE..]
            .try_into()
            .unwrap_or_else(|_| unreachable!("payload area is fixed size"))
    }

    /// Mutable access to the full payload area.
    pub fn payload_mut(&mut self) -> &mut [u8; MAX_PAYLOAD_SIZE] {
        (&mut self.raw[HEADER_SIZE..])
            .try_into()
            .unwrap_or_else(|_| unreachable!("payload area is fixed size"))
    }

    /// Payload bytes covered by the length field, clamped to the payload area.
    pub fn used_payload(&self) -> &[u8] {
        let used = self.payload_len();
        &self.raw[HEADER_SIZE..HEADER_SIZE + used]
    }

    /// Number of payload bytes covered by the length field.
    pub fn payload_len(&self) -> usize {
        usize::from(self.length().min(MAX_LENGTH)).saturating_sub(usize::from(MIN_LENGTH))
    }

    /// Set the length field from a payload byte count.
    ///
    /// A count larger than [`MAX_PAYLOAD_SIZE`] is rejected and leaves the
    /// frame unchanged.
    pub fn set_payload_len(&mut self, payload_len: usize) -> Result<()> {
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD_SIZE,
            });
        }
        self.raw[LENGTH] = MIN_LENGTH + payload_len as u8;
        Ok(())
    }

    /// The whole fixed-size frame buffer, including unused payload bytes.
    pub fn as_bytes(&self) -> &[u8; MAX_FRAME_SIZE] {
        &self.raw
    }

    /// Mutable access to the frame buffer; the receive target for a radio.
    pub fn as_bytes_mut(&mut self) -> &mut [u8; MAX_FRAME_SIZE] {
        &mut self.raw
    }

    /// The bytes that go on the air: the length byte plus `length` bytes.
    pub fn wire_bytes(&self) -> &[u8] {
        &self.raw[..self.wire_size()]
    }

    /// Number of bytes this frame occupies on the air.
    pub fn wire_size(&self) -> usize {
        1 + usize::from(self.length().min(MAX_LENGTH))
    }

    /// Whether the length field describes a complete header and fits the buffer.
    pub fn is_well_formed(&self) -> bool {
        (MIN_LENGTH..=MAX_LENGTH).contains(&self.length())
    }

    /// Reset every byte and the RSSI to zero.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            raw: [0u8; MAX_FRAME_SIZE],
            rssi: 0,
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("length", &self.length())
            .field("version", &self.version())
            .field("group", &self.group())
            .field("protocol", &self.protocol())
            .field("payload", &self.used_payload())
            .field("rssi", &self.rssi)
            .finish()
    }
}
