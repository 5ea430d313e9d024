/// Errors returned by radio operations.
///
/// Only the send and configuration paths return errors. Faults on the receive
/// path are counted and logged, never surfaced.
#[derive(Debug, thiserror::Error)]
pub enum RadioError {
    /// The radio device rejected a request.
    #[error("radio device error: {0}")]
    Hal(#[from] radiolink_hal::HalError),

    /// A frame could not be built.
    #[error("frame error: {0}")]
    Frame(#[from] radiolink_frame::FrameError),

    /// A setting is outside its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The receive loop thread could not be started.
    #[error("failed to start receive loop: {0}")]
    Spawn(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RadioError>;
