/// Errors reported by a radio device.
#[derive(Debug, thiserror::Error)]
pub enum HalError {
    /// The device rejected a configuration request.
    #[error("radio configuration rejected: {0}")]
    Config(String),

    /// The device could not change power state or is otherwise faulted.
    #[error("radio hardware fault: {0}")]
    Hardware(String),

    /// A PDU could not be put on the air.
    #[error("transmit failed: {0}")]
    Transmit(String),

    /// The PDU exceeds what the device can send in one packet.
    #[error("PDU too large ({size} bytes, max {max})")]
    PduTooLarge { size: usize, max: usize },

    /// The operation requires an enabled device.
    #[error("radio is not enabled")]
    NotEnabled,

    /// An I/O error from a simulated device's host socket.
    #[error("radio I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HalError>;
