use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use radiolink_frame::{Frame, Message, MessageKind, Number, Text};
use radiolink_hal::RadioDevice;
use radiolink_queue::{pipeline, Drain, HandoffBuffer};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::{validate_band, validate_power, RadioConfig};
use crate::dispatch::Dispatcher;
use crate::error::{RadioError, Result};
use crate::receiver::{LinkState, ReceiveLoop};
use crate::sender::RadioSender;

/// Pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RadioStats {
    /// Frames the device delivered to the receive loop.
    pub received: u64,
    /// Frames moved into the receive queue.
    pub committed: u64,
    /// Frames lost because every receive buffer was in use.
    pub dropped_pool_exhausted: u64,
    /// Frames lost because the receive queue was full.
    pub dropped_queue_full: u64,
    /// Frames ignored because they belong to another group.
    pub dropped_foreign_group: u64,
    /// Frames whose length field disagreed with what was received.
    pub dropped_malformed: u64,
    /// Datagrams decoded, whether or not a handler was registered.
    pub dispatched: u64,
    /// Frames passed to the unknown-frame path.
    pub fallback: u64,
    /// Frames waiting in the receive queue.
    pub queued: usize,
    /// Receive buffers currently free.
    pub free_buffers: usize,
}

/// A broadcast radio.
///
/// Received frames are collected by a background thread into a bounded
/// queue while the radio is enabled; the application processes them with
/// [`poll`](Radio::poll), [`wait_for`](Radio::wait_for) or
/// [`handle_queue`](Radio::handle_queue), which run the registered handlers
/// on the calling thread.
///
/// Sending works from any thread through [`sender`](Radio::sender).
pub struct Radio<D: RadioDevice> {
    device: Arc<D>,
    config: RadioConfig,
    state: Arc<LinkState>,
    sender: RadioSender<D>,
    drain: Drain<Frame, Dispatcher>,
    producer: Option<HandoffBuffer<Frame>>,
    rx_thread: Option<JoinHandle<HandoffBuffer<Frame>>>,
}

impl<D: RadioDevice> Radio<D> {
    /// Create a disabled radio over `device`.
    pub fn new(device: D, config: RadioConfig) -> Result<Self> {
        config.validate()?;

        let device = Arc::new(device);
        let state = Arc::new(LinkState::new(config.group));
        let sender = RadioSender::new(Arc::clone(&device), Arc::clone(&state));
        let (producer, drain) = pipeline(config.rx_buffers, Frame::default);

        Ok(Self {
            device,
            config,
            state,
            sender,
            drain: drain.with_handler(Dispatcher::new()),
            producer: Some(producer),
            rx_thread: None,
        })
    }

    /// Configure and power up the device, then start the receive loop.
    ///
    /// Enabling an enabled radio does nothing.
    pub fn enable(&mut self) -> Result<()> {
        if self.rx_thread.is_some() {
            return Ok(());
        }

        self.device.configure(&self.config.settings())?;
        self.device.enable()?;

        let producer = match self.producer.take() {
            Some(producer) => producer,
            None => self.rebuild_pipeline(),
        };
        self.state.stop.store(false, Ordering::Release);
        let receive_loop = ReceiveLoop {
            device: Arc::clone(&self.device),
            state: Arc::clone(&self.state),
            timeout: self.config.receive_timeout,
            filter_group: self.config.filter_group,
        };

        match receive_loop.spawn(producer) {
            Ok(handle) => {
                self.rx_thread = Some(handle);
                info!(
                    device = self.device.device_name(),
                    group = self.config.group,
                    band = self.config.band,
                    power = self.config.power,
                    "radio enabled"
                );
                Ok(())
            }
            Err(err) => {
                // The producer half went down with the closure.
                let producer = self.rebuild_pipeline();
                self.producer = Some(producer);
                let _ = self.device.disable();
                Err(RadioError::Spawn(err))
            }
        }
    }

    /// Stop the receive loop and power down the device.
    ///
    /// Frames already queued stay available to the drain methods.
    pub fn disable(&mut self) -> Result<()> {
        let Some(handle) = self.rx_thread.take() else {
            return Ok(());
        };

        self.state.stop.store(true, Ordering::Release);
        let mut producer = match handle.join() {
            Ok(producer) => producer,
            Err(_) => {
                error!("receive loop panicked; receive buffers reset");
                self.rebuild_pipeline()
            }
        };
        producer.recycle();
        self.producer = Some(producer);

        self.device.disable()?;
        info!(device = self.device.device_name(), "radio disabled");
        Ok(())
    }

    /// Whether the receive loop is running.
    pub fn is_enabled(&self) -> bool {
        self.rx_thread.is_some()
    }

    /// Change the group used for sending and receive filtering.
    pub fn set_group(&mut self, group: u8) -> Result<()> {
        self.config.group = group;
        self.state.group.store(group, Ordering::Relaxed);
        self.reconfigure()
    }

    /// Change the transmit power level, 0..=7.
    pub fn set_transmit_power(&mut self, power: u8) -> Result<()> {
        validate_power(power)?;
        self.config.power = power;
        self.reconfigure()
    }

    /// Change the frequency band, 0..=100.
    pub fn set_frequency_band(&mut self, band: u8) -> Result<()> {
        validate_band(band)?;
        self.config.band = band;
        self.reconfigure()
    }

    pub fn group(&self) -> u8 {
        self.config.group
    }

    pub fn config(&self) -> &RadioConfig {
        &self.config
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Signal strength of the most recently accepted frame, in dBm.
    ///
    /// 0 until a frame has been received.
    pub fn rssi(&self) -> i32 {
        self.state.last_rssi.load(Ordering::Relaxed)
    }

    /// A cloneable handle for sending from other threads.
    pub fn sender(&self) -> RadioSender<D> {
        self.sender.clone()
    }

    pub fn send_number(&self, value: impl Into<Number>) -> Result<()> {
        self.sender.send_number(value)
    }

    pub fn send_string(&self, text: &str) -> Result<()> {
        self.sender.send_string(text)
    }

    pub fn send_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.sender.send_bytes(bytes)
    }

    pub fn send_keyed(&self, key: &str, value: impl Into<Number>) -> Result<()> {
        self.sender.send_keyed(key, value)
    }

    pub fn send_message(&self, message: &Message<'_>) -> Result<()> {
        self.sender.send_message(message)
    }

    pub fn send(&self, frame: &mut Frame) -> Result<()> {
        self.sender.send(frame)
    }

    pub fn on_int(&mut self, handler: impl FnMut(i32) + Send + 'static) -> &mut Self {
        self.dispatcher_mut().on_int(handler);
        self
    }

    pub fn on_double(&mut self, handler: impl FnMut(f64) + Send + 'static) -> &mut Self {
        self.dispatcher_mut().on_double(handler);
        self
    }

    pub fn on_string(&mut self, handler: impl FnMut(Text<'_>) + Send + 'static) -> &mut Self {
        self.dispatcher_mut().on_string(handler);
        self
    }

    pub fn on_keyed_int(
        &mut self,
        handler: impl FnMut(i32, Text<'_>) + Send + 'static,
    ) -> &mut Self {
        self.dispatcher_mut().on_keyed_int(handler);
        self
    }

    pub fn on_keyed_double(
        &mut self,
        handler: impl FnMut(f64, Text<'_>) + Send + 'static,
    ) -> &mut Self {
        self.dispatcher_mut().on_keyed_double(handler);
        self
    }

    pub fn on_message(
        &mut self,
        kind: MessageKind,
        handler: impl FnMut(&Message<'_>, &Frame) + Send + 'static,
    ) -> &mut Self {
        self.dispatcher_mut().on_message(kind, handler);
        self
    }

    pub fn on_unknown(&mut self, handler: impl FnMut(&Frame) + Send + 'static) -> &mut Self {
        self.dispatcher_mut().on_unknown(handler);
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        self.drain.handler()
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        self.drain.handler_mut()
    }

    /// Dispatch every frame queued right now. Returns the number processed.
    pub fn poll(&mut self) -> usize {
        self.drain.poll()
    }

    /// Dispatch at most one frame, waiting up to `timeout` for it.
    ///
    /// Returns `false` if nothing arrived in time. The wait is the full
    /// `timeout` even when the receive loop has died.
    pub fn wait_for(&mut self, timeout: Duration) -> bool {
        self.drain.wait_for(timeout)
    }

    /// Drain every queued frame through `handler` instead of the registered
    /// handlers.
    pub fn handle_queue(&mut self, handler: impl FnMut(&Frame)) -> usize {
        self.drain.handle_queue(handler)
    }

    /// Frames waiting to be dispatched.
    pub fn pending(&self) -> usize {
        self.drain.pending()
    }

    pub fn stats(&self) -> RadioStats {
        let pipeline = self.drain.stats();
        let counts = self.dispatcher().counts();
        RadioStats {
            received: self.state.received.load(Ordering::Relaxed),
            committed: pipeline.committed,
            dropped_pool_exhausted: self.state.dropped_pool_exhausted.load(Ordering::Relaxed),
            dropped_queue_full: pipeline.dropped_queue_full,
            dropped_foreign_group: self.state.dropped_foreign_group.load(Ordering::Relaxed),
            dropped_malformed: self.state.dropped_malformed.load(Ordering::Relaxed),
            dispatched: counts.delivered + counts.unhandled,
            fallback: counts.fallback,
            queued: pipeline.queued,
            free_buffers: pipeline.free,
        }
    }

    fn reconfigure(&self) -> Result<()> {
        if self.device.is_enabled() {
            self.device.configure(&self.config.settings())?;
            debug!(settings = ?self.config.settings(), "radio reconfigured");
        }
        Ok(())
    }

    /// Replace the pipeline with a fresh one, keeping the registered
    /// handlers. Frames in the old queue are lost.
    fn rebuild_pipeline(&mut self) -> HandoffBuffer<Frame> {
        let dispatcher = std::mem::take(self.drain.handler_mut());
        let (producer, drain) = pipeline(self.config.rx_buffers, Frame::default);
        self.drain = drain.with_handler(dispatcher);
        producer
    }
}

impl<D: RadioDevice> Drop for Radio<D> {
    fn drop(&mut self) {
        if let Err(err) = self.disable() {
            debug!(error = %err, "disable on drop failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radiolink_hal::{Ether, LoopbackRadio};
    use std::sync::mpsc;

    fn radio(ether: &Ether) -> Radio<LoopbackRadio> {
        Radio::new(ether.attach(), RadioConfig::default()).expect("default config is valid")
    }

    #[test]
    fn new_rejects_invalid_config() {
        let ether = Ether::new();
        let config = RadioConfig {
            rx_buffers: 0,
            ..RadioConfig::default()
        };
        assert!(matches!(
            Radio::new(ether.attach(), config),
            Err(RadioError::InvalidParameter(_))
        ));
    }

    #[test]
    fn enable_twice_is_noop_and_disable_is_idempotent() {
        let ether = Ether::new();
        let mut radio = radio(&ether);

        radio.enable().expect("enable");
        radio.enable().expect("second enable");
        assert!(radio.is_enabled());
        assert!(radio.device().is_enabled());

        radio.disable().expect("disable");
        radio.disable().expect("second disable");
        assert!(!radio.is_enabled());
        assert!(!radio.device().is_enabled());
        assert_eq!(radio.stats().free_buffers, 10);
    }

    #[test]
    fn setters_validate_ranges() {
        let ether = Ether::new();
        let mut radio = radio(&ether);

        assert!(radio.set_transmit_power(8).is_err());
        assert!(radio.set_frequency_band(101).is_err());
        assert_eq!(radio.config().power, 7);

        radio.set_transmit_power(0).expect("power 0 is valid");
        radio.set_frequency_band(100).expect("band 100 is valid");
        radio.set_group(3).expect("any group is valid");
        assert_eq!(radio.group(), 3);
        assert_eq!(radio.config().band, 100);
    }

    #[test]
    fn send_requires_enabled_radio() {
        let ether = Ether::new();
        let radio = radio(&ether);
        assert!(matches!(
            radio.send_number(1),
            Err(RadioError::Hal(radiolink_hal::HalError::NotEnabled))
        ));
    }

    #[test]
    fn registering_handlers_through_radio() {
        let ether = Ether::new();
        let mut radio = radio(&ether);
        let (tx, _rx) = mpsc::channel::<i32>();

        radio
            .on_int(move |v| {
                let _ = tx.send(v);
            })
            .on_unknown(|_| {});

        assert!(radio
            .dispatcher()
            .is_registered(radiolink_frame::MessageKind::Int));
        assert!(radio.dispatcher().has_fallback());
    }

    #[test]
    fn wait_for_on_idle_radio_times_out() {
        let ether = Ether::new();
        let mut radio = radio(&ether);

        let started = std::time::Instant::now();
        assert!(!radio.wait_for(Duration::from_millis(100)));
        assert!(started.elapsed() >= Duration::from_millis(90));
    }
}
