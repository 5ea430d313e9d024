use std::time::Duration;

use radiolink_hal::{
    RadioSettings, DEFAULT_FREQUENCY_BAND, DEFAULT_GROUP, DEFAULT_TX_POWER, MAX_FREQUENCY_BAND,
    MAX_TX_POWER,
};
use serde::{Deserialize, Serialize};

use crate::error::{RadioError, Result};

/// Default number of receive buffers.
pub const DEFAULT_RX_BUFFERS: usize = 10;

/// Default time the receive loop waits on the device per iteration.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(10);

/// Radio configuration.
///
/// Every field has a default, so a JSON document only needs the fields it
/// changes. The receive timeout is expressed in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RadioConfig {
    /// Frequency band, 0..=100 (2400 MHz + band).
    pub band: u8,
    /// Transmit power level, 0..=7.
    pub power: u8,
    /// Group this radio sends on and listens to.
    pub group: u8,
    /// Receive buffers; at most this many frames are queued or in flight.
    pub rx_buffers: usize,
    /// How long the receive loop blocks on the device before checking for
    /// shutdown. Bounds the latency of [`disable`](crate::Radio::disable).
    #[serde(rename = "receive_timeout_ms", with = "millis")]
    pub receive_timeout: Duration,
    /// Drop received frames whose group differs from [`group`](Self::group).
    pub filter_group: bool,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            band: DEFAULT_FREQUENCY_BAND,
            power: DEFAULT_TX_POWER,
            group: DEFAULT_GROUP,
            rx_buffers: DEFAULT_RX_BUFFERS,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            filter_group: true,
        }
    }
}

impl RadioConfig {
    /// Check every field against its valid range.
    pub fn validate(&self) -> Result<()> {
        validate_band(self.band)?;
        validate_power(self.power)?;
        if self.rx_buffers == 0 {
            return Err(RadioError::InvalidParameter(
                "rx_buffers must be at least 1".to_string(),
            ));
        }
        if self.receive_timeout.is_zero() {
            return Err(RadioError::InvalidParameter(
                "receive_timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The subset of settings pushed to the device.
    pub fn settings(&self) -> RadioSettings {
        RadioSettings {
            band: self.band,
            power: self.power,
            group: self.group,
        }
    }
}

pub(crate) fn validate_band(band: u8) -> Result<()> {
    if band > MAX_FREQUENCY_BAND {
        return Err(RadioError::InvalidParameter(format!(
            "frequency band {band} out of range (0..={MAX_FREQUENCY_BAND})"
        )));
    }
    Ok(())
}

pub(crate) fn validate_power(power: u8) -> Result<()> {
    if power > MAX_TX_POWER {
        return Err(RadioError::InvalidParameter(format!(
            "transmit power {power} out of range (0..={MAX_TX_POWER})"
        )));
    }
    Ok(())
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
