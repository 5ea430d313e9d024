/// Errors that can occur while encoding or interpreting frames.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Fewer bytes than the structure being read requires.
    #[error("frame truncated ({available} bytes, need {needed})")]
    Truncated { needed: usize, available: usize },

    /// The length byte does not describe a valid frame.
    #[error("frame length field {length} out of range (max {max})")]
    LengthOutOfRange { length: usize, max: usize },

    /// The encoded payload does not fit in one frame.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The wire version is not one this codec understands.
    #[error("unsupported frame version {0}")]
    UnsupportedVersion(u8),

    /// The inner protocol is not the datagram protocol.
    #[error("unsupported protocol {0}")]
    UnsupportedProtocol(u8),

    /// The datagram type tag is not recognized.
    #[error("unknown datagram type tag {0}")]
    UnknownTag(u8),
}

pub type Result<T> = std::result::Result<T, FrameError>;
