//! Radio device abstraction.
//!
//! This is the lowest layer of radiolink. It models the radio peripheral as a
//! [`RadioDevice`]: something that can be configured, switched on and off,
//! transmit one PDU, and report when a receive buffer has been filled.
//!
//! Two simulated devices are provided:
//! - [`LoopbackRadio`] attached to a shared in-process [`Ether`]
//! - [`UdpRadio`], carrying PDUs over UDP datagrams between processes

pub mod error;
pub mod loopback;
pub mod traits;
pub mod udp;

pub use error::{HalError, Result};
pub use loopback::{Ether, LoopbackRadio};
pub use traits::{
    RadioDevice, RadioSettings, Reception, DEFAULT_FREQUENCY_BAND, DEFAULT_GROUP,
    DEFAULT_TX_POWER, MAX_FREQUENCY_BAND, MAX_TX_POWER,
};
pub use udp::UdpRadio;
