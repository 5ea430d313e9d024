use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tracing::{debug, info, trace};

use crate::error::{HalError, Result};
use crate::traits::{RadioDevice, RadioSettings, Reception, MAX_FREQUENCY_BAND, MAX_TX_POWER};

/// Largest PDU carried in one datagram.
const MAX_UDP_PDU: usize = 255;

/// Smallest read timeout the host socket accepts.
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// A radio simulated over UDP.
///
/// Each datagram is one byte carrying the frequency band followed by the PDU.
/// Datagrams tagged with another band are discarded, so stations on different
/// bands sharing a port do not hear each other. UDP carries no signal
/// strength; received frames report an RSSI of 0.
pub struct UdpRadio {
    socket: UdpSocket,
    destination: SocketAddr,
    settings: Mutex<RadioSettings>,
    enabled: AtomicBool,
}

impl UdpRadio {
    /// Bind the local socket and address transmissions to `destination`.
    pub fn bind(local: impl ToSocketAddrs, destination: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(local)?;
        info!(local = ?socket.local_addr().ok(), %destination, "udp radio bound");
        Ok(Self {
            socket,
            destination,
            settings: Mutex::new(RadioSettings::default()),
            enabled: AtomicBool::new(false),
        })
    }

    /// Address the host socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Address transmissions are sent to.
    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    fn settings(&self) -> RadioSettings {
        *self
            .settings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RadioDevice for UdpRadio {
    fn configure(&self, settings: &RadioSettings) -> Result<()> {
        if settings.band > MAX_FREQUENCY_BAND {
            return Err(HalError::Config(format!(
                "frequency band {} out of range",
                settings.band
            )));
        }
        if settings.power > MAX_TX_POWER {
            return Err(HalError::Config(format!(
                "power level {} out of range",
                settings.power
            )));
        }
        *self
            .settings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = *settings;
        debug!(?settings, "udp radio configured");
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
        if pdu.len() > MAX_UDP_PDU {
            return Err(HalError::PduTooLarge {
                size: pdu.len(),
                max: MAX_UDP_PDU,
            });
        }

        let mut datagram = [0u8; MAX_UDP_PDU + 1];
        datagram[0] = self.settings().band;
        datagram[1..=pdu.len()].copy_from_slice(pdu);

        let sent = self
            .socket
            .send_to(&datagram[..=pdu.len()], self.destination)
            .map_err(|err| HalError::Transmit(err.to_string()))?;
        if sent != pdu.len() + 1 {
            return Err(HalError::Transmit(format!(
                "short datagram ({sent} of {} bytes)",
                pdu.len() + 1
            )));
        }
        trace!(len = pdu.len(), destination = %self.destination, "udp transmit");
        Ok(())
    }

    fn receive(&self, buf: &mut [u8], timeout: Duration) -> Result<Option<Reception>> {
        if !self.is_enabled() {
            return Err(HalError::NotEnabled);
        }
        self.socket
            .set_read_timeout(Some(timeout.max(MIN_READ_TIMEOUT)))?;

        let band = self.settings().band;
        let mut datagram = [0u8; MAX_UDP_PDU + 1];
        let (n, from) = match self.socket.recv_from(&mut datagram) {
            Ok(received) => received,
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return Ok(None);
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => return Ok(None),
            Err(err) => return Err(HalError::Io(err)),
        };

        if n == 0 || datagram[0] != band {
            trace!(%from, n, "udp datagram for another band ignored");
            return Ok(None);
        }

        let pdu = &datagram[1..n];
        let copied = pdu.len().min(buf.len());
        buf[..copied].copy_from_slice(&pdu[..copied]);
        Ok(Some(Reception {
            len: pdu.len(),
            rssi: 0,
        }))
    }

    fn device_name(&self) -> &'static str {
        "udp"
    }
}
