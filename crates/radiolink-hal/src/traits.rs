use std::time::Duration;

use crate::error::Result;

/// Default radio group.
pub const DEFAULT_GROUP: u8 = 111;

/// Default transmit power level.
pub const DEFAULT_TX_POWER: u8 = 7;

/// Highest supported transmit power level.
pub const MAX_TX_POWER: u8 = 7;

/// Default frequency band.
pub const DEFAULT_FREQUENCY_BAND: u8 = 7;

/// Highest supported frequency band (2400 MHz + band).
pub const MAX_FREQUENCY_BAND: u8 = 100;

/// Register-level settings pushed to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioSettings {
    /// Frequency band, 0..=100.
    pub band: u8,
    /// Transmit power level, 0..=7.
    pub power: u8,
    /// Group (address prefix) this station belongs to.
    pub group: u8,
}

impl Default for RadioSettings {
    fn default() -> Self {
        Self {
            band: DEFAULT_FREQUENCY_BAND,
            power: DEFAULT_TX_POWER,
            group: DEFAULT_GROUP,
        }
    }
}

/// Metadata of one filled receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reception {
    /// Number of PDU bytes received. May exceed the buffer length, in which
    /// case only the leading bytes were written.
    pub len: usize,
    /// Received signal strength in dBm.
    pub rssi: i32,
}

/// A radio peripheral.
///
/// All methods take `&self`: the receive loop and any number of senders share
/// one device, and implementations synchronize internally.
pub trait RadioDevice: Send + Sync + 'static {
    /// Apply band, power and group settings.
    fn configure(&self, settings: &RadioSettings) -> Result<()>;

    /// Power up the receiver and transmitter.
    fn enable(&self) -> Result<()>;

    /// Power down the radio.
    fn disable(&self) -> Result<()>;

    /// Whether the radio is currently enabled.
    fn is_enabled(&self) -> bool;

    /// Put one PDU on the air.
    fn transmit(&self, pdu: &[u8]) -> Result<()>;

    /// Wait up to `timeout` for a received PDU and write it into `buf`.
    ///
    /// Returns `Ok(None)` when nothing arrived in time.
    fn receive(&self, buf: &mut [u8], timeout: Duration) -> Result<Option<Reception>>;

    /// Device name for diagnostics.
    fn device_name(&self) -> &'static str;
}
