use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard};

use radiolink_frame::{
    encode_message, Frame, FrameError, Message, Number, Text, FRAME_VERSION, MAX_LENGTH,
};
use radiolink_hal::RadioDevice;
use tracing::trace;

use crate::error::Result;
use crate::receiver::LinkState;

/// The transmit half of a radio.
///
/// Cheap to clone; clones share one transmit buffer, guarded by a mutex, so
/// concurrent sends from several threads are serialized.
pub struct RadioSender<D> {
    device: Arc<D>,
    state: Arc<LinkState>,
    buffer: Arc<Mutex<Frame>>,
}

impl<D> Clone for RadioSender<D> {
    fn clone(&self) -> Self {
        Self {
            device: Arc::clone(&self.device),
            state: Arc::clone(&self.state),
            buffer: Arc::clone(&self.buffer),
        }
    }
}

impl<D: RadioDevice> RadioSender<D> {
    pub(crate) fn new(device: Arc<D>, state: Arc<LinkState>) -> Self {
        Self {
            device,
            state,
            buffer: Arc::new(Mutex::new(Frame::default())),
        }
    }

    /// Send an integer or a double.
    pub fn send_number(&self, value: impl Into<Number>) -> Result<()> {
        self.send_message(&Message::number(value))
    }

    /// Send a string. At most 30 bytes fit in one frame.
    pub fn send_string(&self, text: &str) -> Result<()> {
        self.send_bytes(text.as_bytes())
    }

    /// Send a string given as raw bytes; it need not be UTF-8.
    pub fn send_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.send_message(&Message::string(Text::new(bytes)))
    }

    /// Send a value under a key.
    ///
    /// The key may be up to 26 bytes with an integer, or 22 with a double.
    pub fn send_keyed(&self, key: &str, value: impl Into<Number>) -> Result<()> {
        self.send_message(&Message::keyed(key, value))
    }

    /// Encode and transmit one datagram on this radio's group.
    pub fn send_message(&self, message: &Message<'_>) -> Result<()> {
        let mut frame = self.lock_buffer();
        *frame = Frame::new(self.group());
        encode_message(&mut frame, message)?;
        self.device.transmit(frame.wire_bytes())?;
        trace!(
            kind = message.kind().name(),
            len = frame.wire_size(),
            "datagram sent"
        );
        Ok(())
    }

    /// Transmit a caller-built frame.
    ///
    /// The wire version and this radio's group are written into `frame`
    /// first; the protocol byte and payload are sent as given.
    pub fn send(&self, frame: &mut Frame) -> Result<()> {
        if !frame.is_well_formed() {
            return Err(FrameError::LengthOutOfRange {
                length: usize::from(frame.length()),
                max: usize::from(MAX_LENGTH),
            }
            .into());
        }
        frame.set_version(FRAME_VERSION);
        frame.set_group(self.group());

        let _guard = self.lock_buffer();
        self.device.transmit(frame.wire_bytes())?;
        trace!(
            protocol = frame.protocol(),
            len = frame.wire_size(),
            "raw frame sent"
        );
        Ok(())
    }

    fn group(&self) -> u8 {
        self.state.group.load(Ordering::Relaxed)
    }

    fn lock_buffer(&self) -> MutexGuard<'_, Frame> {
        // The buffer is rebuilt before every use, so a poisoned one is harmless.
        self.buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
