//! Broadcast radio datagrams over a [`RadioDevice`](radiolink_hal::RadioDevice).
//!
//! A [`Radio`] owns the device, a background receive loop that fills a fixed
//! set of frame buffers, and a [`Dispatcher`] that decodes queued frames into
//! typed handler calls when the application drains them.
//!
//! ```
//! use std::time::Duration;
//!
//! use radiolink_hal::Ether;
//! use radiolink_radio::{Radio, RadioConfig};
//!
//! let ether = Ether::new();
//! let mut alice = Radio::new(ether.attach(), RadioConfig::default())?;
//! let mut bob = Radio::new(ether.attach(), RadioConfig::default())?;
//!
//! let (tx, rx) = std::sync::mpsc::channel();
//! bob.on_int(move |value| {
//!     let _ = tx.send(value);
//! });
//! alice.enable()?;
//! bob.enable()?;
//!
//! alice.send_number(42)?;
//! assert!(bob.wait_for(Duration::from_secs(2)));
//! assert_eq!(rx.try_recv().ok(), Some(42));
//! # Ok::<(), radiolink_radio::RadioError>(())
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod radio;
mod receiver;
pub mod sender;

pub use config::{RadioConfig, DEFAULT_RECEIVE_TIMEOUT, DEFAULT_RX_BUFFERS};
pub use dispatch::{Dispatch, DispatchCounts, Dispatcher};
pub use error::{RadioError, Result};
pub use radio::{Radio, RadioStats};
pub use sender::RadioSender;
