use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use radiolink_frame::{check_received, Frame};
use radiolink_hal::RadioDevice;
use radiolink_queue::HandoffBuffer;
use tracing::{debug, info, trace, warn};

/// State shared between the application side of a radio and its receive loop.
#[derive(Debug, Default)]
pub(crate) struct LinkState {
    pub(crate) group: AtomicU8,
    pub(crate) stop: AtomicBool,
    pub(crate) last_rssi: AtomicI32,
    pub(crate) received: AtomicU64,
    pub(crate) dropped_pool_exhausted: AtomicU64,
    pub(crate) dropped_foreign_group: AtomicU64,
    pub(crate) dropped_malformed: AtomicU64,
}

impl LinkState {
    pub(crate) fn new(group: u8) -> Self {
        Self {
            group: AtomicU8::new(group),
            ..Self::default()
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

pub(crate) struct ReceiveLoop<D> {
    pub(crate) device: Arc<D>,
    pub(crate) state: Arc<LinkState>,
    pub(crate) timeout: Duration,
    pub(crate) filter_group: bool,
}

impl<D: RadioDevice> ReceiveLoop<D> {
    /// Run on a dedicated thread until the stop flag is raised.
    ///
    /// The thread hands the producer half back when it exits so the radio can
    /// be enabled again.
    pub(crate) fn spawn(
        self,
        producer: HandoffBuffer<Frame>,
    ) -> std::io::Result<JoinHandle<HandoffBuffer<Frame>>> {
        thread::Builder::new()
            .name("radiolink-rx".to_string())
            .spawn(move || self.run(producer))
    }

    fn run(self, mut producer: HandoffBuffer<Frame>) -> HandoffBuffer<Frame> {
        info!(device = self.device.device_name(), "receive loop started");
        let mut scratch = Frame::default();

        while !self.state.stop.load(Ordering::Acquire) {
            let staged = producer.current_write_target(false);
            let pooled = staged.is_some();
            let target = staged.unwrap_or(&mut scratch);

            let reception = match self.device.receive(target.as_bytes_mut(), self.timeout) {
                Ok(Some(reception)) => reception,
                Ok(None) => continue,
                Err(err) => {
                    warn!(error = %err, "radio receive failed");
                    thread::sleep(self.timeout);
                    continue;
                }
            };
            LinkState::bump(&self.state.received);

            // A buffer may have been freed while we waited on the device.
            let Some(frame) = producer.current_write_target(false) else {
                LinkState::bump(&self.state.dropped_pool_exhausted);
                debug!("receive buffers exhausted; frame dropped");
                continue;
            };
            if !pooled {
                *frame.as_bytes_mut() = *scratch.as_bytes();
            }

            if let Err(err) = check_received(frame, reception.len) {
                LinkState::bump(&self.state.dropped_malformed);
                debug!(error = %err, len = reception.len, "malformed frame dropped");
                continue;
            }

            let group = self.state.group.load(Ordering::Relaxed);
            if self.filter_group && frame.group() != group {
                LinkState::bump(&self.state.dropped_foreign_group);
                trace!(frame_group = frame.group(), group, "frame for another group ignored");
                continue;
            }

            frame.set_rssi(reception.rssi);
            self.state.last_rssi.store(reception.rssi, Ordering::Relaxed);
            trace!(
                len = reception.len,
                rssi = reception.rssi,
                "frame received"
            );
            producer.current_write_target(true);
        }

        info!(device = self.device.device_name(), "receive loop stopped");
        producer
    }
}
