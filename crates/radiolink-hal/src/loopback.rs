use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::{debug, trace};

use crate::error::{HalError, Result};
use crate::traits::{RadioDevice, RadioSettings, Reception, MAX_TX_POWER};

/// Frames a station can hold before the air starts dropping them.
const INBOX_CAPACITY: usize = 64;

/// Largest PDU the simulated air carries.
const MAX_AIR_PDU: usize = 255;

struct AirFrame {
    pdu: Vec<u8>,
    rssi: i32,
}

struct Station {
    id: u64,
    band: Arc<AtomicU8>,
    enabled: Arc<AtomicBool>,
    inbox: Sender<AirFrame>,
}

/// A shared in-process radio medium.
///
/// Every [`LoopbackRadio`] attached to the same `Ether` hears the
/// transmissions of every other enabled radio tuned to the same band.
/// A radio never hears itself.
#[derive(Clone, Default)]
pub struct Ether {
    stations: Arc<Mutex<Vec<Station>>>,
    next_id: Arc<AtomicU64>,
}

impl Ether {
    /// Create an empty medium.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new radio to this medium.
    pub fn attach(&self) -> LoopbackRadio {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (inbox_tx, inbox_rx) = crossbeam_channel::bounded(INBOX_CAPACITY);
        let settings = RadioSettings::default();
        let band = Arc::new(AtomicU8::new(settings.band));
        let enabled = Arc::new(AtomicBool::new(false));

        self.lock_stations().push(Station {
            id,
            band: Arc::clone(&band),
            enabled: Arc::clone(&enabled),
            inbox: inbox_tx,
        });
        debug!(station = id, "radio attached to loopback ether");

        LoopbackRadio {
            id,
            ether: self.clone(),
            band,
            power: AtomicU8::new(settings.power),
            enabled,
            inbox: inbox_rx,
        }
    }

    /// Put a PDU on the air as if sent by a station outside this process.
    ///
    /// Returns the number of radios that heard it.
    pub fn inject(&self, band: u8, pdu: &[u8], rssi: i32) -> usize {
        self.broadcast(None, band, pdu, rssi)
    }

    /// Number of radios currently attached.
    pub fn station_count(&self) -> usize {
        self.lock_stations().len()
    }

    fn broadcast(&self, from: Option<u64>, band: u8, pdu: &[u8], rssi: i32) -> usize {
        let mut heard = 0usize;
        self.lock_stations().retain(|station| {
            if Some(station.id) == from
                || !station.enabled.load(Ordering::Acquire)
                || station.band.load(Ordering::Acquire) != band
            {
                return true;
            }
            let frame = AirFrame {
                pdu: pdu.to_vec(),
                rssi,
            };
            match station.inbox.try_send(frame) {
                Ok(()) => {
                    heard += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    trace!(station = station.id, "loopback inbox full; frame lost");
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            }
        });
        heard
    }

    fn lock_stations(&self) -> std::sync::MutexGuard<'_, Vec<Station>> {
        // A poisoned list is still structurally valid.
        self.stations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A simulated radio attached to an [`Ether`].
///
/// Received signal strength is derived from the sender's transmit power:
/// -40 dBm at full power, 6 dB weaker for each level below it.
pub struct LoopbackRadio {
    id: u64,
    ether: Ether,
    band: Arc<AtomicU8>,
    power: AtomicU8,
    enabled: Arc<AtomicBool>,
    inbox: Receiver<AirFrame>,
}

impl LoopbackRadio {
    /// Station identifier on the ether.
    pub fn station_id(&self) -> u64 {
        self.id
    }

    fn simulated_rssi(power: u8) -> i32 {
        -40 - 6 * i32::from(MAX_TX_POWER.saturating_sub(power))
    }
}

impl RadioDevice for LoopbackRadio {
    fn configure(&self, settings: &RadioSettings) -> Result<()> {
        if settings.power > MAX_TX_POWER {
            return Err(HalError::Config(format!(
                "power level {} out of range",
                settings.power
            )));
        }
        self.band.store(settings.band, Ordering::Release);
        self.power.store(settings.power, Ordering::Release);
        debug!(station = self.id, ?settings, "loopback radio configured");
        Ok(())
    }

    fn enable(&self) -> Result<()> {
        self.enabled.store(true, Ordering::Release);
        Ok(())
    }

    fn disable(&self) -> Result<()> {
        self.enabled.store(false, Ordering::Release);
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn transmit(&self, pdu: &[u8]) -> Result<()> {
        if !self.is_enabled() {
            return Err(HalError::NotEnabled);
        }
        if pdu.len() > MAX_AIR_PDU {
            return Err(HalError::PduTooLarge {
                size: pdu.len(),
                max: MAX_AIR_PDU,
            });
        }
        let rssi = Self::simulated_rssi(self.power.load(Ordering::Acquire));
        let heard = self.ether.broadcast(
            Some(self.id),
            self.band.load(Ordering::Acquire),
            pdu,
            rssi,
        );
        trace!(station = self.id, len = pdu.len(), heard, "loopback transmit");
        Ok(())
    }

    fn receive(&self, buf: &mut [u8], timeout: Duration) -> Result<Option<Reception>> {
        if !self.is_enabled() {
            return Err(HalError::NotEnabled);
        }
        match self.inbox.recv_timeout(timeout) {
            Ok(frame) => {
                let n = frame.pdu.len().min(buf.len());
                buf[..n].copy_from_slice(&frame.pdu[..n]);
                Ok(Some(Reception {
                    len: frame.pdu.len(),
                    rssi: frame.rssi,
                }))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(HalError::Hardware("detached from loopback ether".into()))
            }
        }
    }

    fn device_name(&self) -> &'static str {
        "loopback"
    }
}

impl Drop for LoopbackRadio {
    fn drop(&mut self) {
        let id = self.id;
        self.ether.lock_stations().retain(|station| station.id != id);
    }
}
