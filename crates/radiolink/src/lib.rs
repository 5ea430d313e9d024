//! Zero-copy receive pipeline and datagram protocol for short-range broadcast
//! radios.
//!
//! A radio fills pooled receive buffers in place; a consumer thread drains
//! them in arrival order and dispatches typed datagrams (integers, doubles,
//! strings and keyed values) to registered handlers.
//!
//! # Crate Structure
//!
//! - [`hal`]: radio device abstraction, plus loopback and UDP simulations
//! - [`frame`]: the 36-byte frame layout and datagram encoding
//! - [`queue`]: buffer pool, bounded queue, handoff and drain
//! - [`radio`]: receive loop, typed dispatch and send path (behind the `radio` feature)

/// Re-export device types.
pub mod hal {
    pub use radiolink_hal::*;
}

/// Re-export frame and datagram types.
pub mod frame {
    pub use radiolink_frame::*;
}

/// Re-export receive pipeline types.
pub mod queue {
    pub use radiolink_queue::*;
}

/// Re-export radio types (requires `radio` feature).
#[cfg(feature = "radio")]
pub mod radio {
    pub use radiolink_radio::*;
}
