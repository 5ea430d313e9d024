use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use crate::pool::Pool;
use crate::queue::QueueConsumer;
use crate::stats::{Counters, PipelineStats};

/// Something that consumes committed buffers.
///
/// Implemented for every `FnMut(&T)` closure.
pub trait Handler<T> {
    fn handle(&mut self, item: &T);
}

impl<T, F> Handler<T> for F
where
    F: FnMut(&T),
{
    fn handle(&mut self, item: &T) {
        self(item)
    }
}

/// Handler that ignores every buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl<T> Handler<T> for Discard {
    fn handle(&mut self, _item: &T) {}
}

/// Consumer side of a pipeline.
///
/// Each drained buffer is lent to the handler by shared reference, then
/// released to the pool as soon as the handler returns or unwinds.
pub struct Drain<T, H = Discard> {
    pool: Pool<T>,
    queue: QueueConsumer<T>,
    handler: H,
    counters: Arc<Counters>,
}

impl<T: Send + 'static> Drain<T, Discard> {
    pub(crate) fn new(pool: Pool<T>, queue: QueueConsumer<T>, counters: Arc<Counters>) -> Self {
        Self {
            pool,
            queue,
            handler: Discard,
            counters,
        }
    }
}

impl<T: Send + 'static, H: Handler<T>> Drain<T, H> {
    /// Replace the registered handler.
    pub fn with_handler<H2: Handler<T>>(self, handler: H2) -> Drain<T, H2> {
        Drain {
            pool: self.pool,
            queue: self.queue,
            handler,
            counters: self.counters,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Handle at most one buffer, waiting up to `timeout` for it.
    ///
    /// Returns `false` when nothing arrived in time. With the producer gone
    /// and the queue empty this still waits the full `timeout`.
    pub fn wait_for(&mut self, timeout: Duration) -> bool {
        match self.queue.pop_wait(timeout) {
            Some(slot) => {
                trace!(slot = slot.index(), "dispatching");
                self.handler.handle(&*slot);
                self.counters.record_drained();
                true
            }
            None => false,
        }
    }

    /// Handle every buffer queued right now with the registered handler.
    ///
    /// Never blocks. Returns the number handled.
    pub fn poll(&mut self) -> usize {
        let handler = &mut self.handler;
        drain_all(&self.queue, &self.counters, |item| handler.handle(item))
    }

    /// Like [`poll`](Drain::poll), with a one-off handler in place of the
    /// registered one.
    pub fn handle_queue(&mut self, mut handler: impl FnMut(&T)) -> usize {
        drain_all(&self.queue, &self.counters, &mut handler)
    }

    /// Buffers waiting to be handled.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn stats(&self) -> PipelineStats {
        self.counters
            .snapshot(self.pool.capacity(), self.pool.available(), self.queue.len())
    }
}

fn drain_all<T>(
    queue: &QueueConsumer<T>,
    counters: &Counters,
    mut handle: impl FnMut(&T),
) -> usize {
    let mut handled = 0usize;
    while let Some(slot) = queue.try_pop() {
        handle(&*slot);
        counters.record_drained();
        handled += 1;
        // `slot` drops here, releasing the buffer before the next pop.
    }
    if handled > 0 {
        trace!(handled, "queue drained");
    }
    handled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pipeline, pipeline_with_queue_capacity, HandoffBuffer};
    use std::collections::HashSet;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::time::Instant;

    fn commit(producer: &mut HandoffBuffer<u32>, value: u32) {
        if let Some(buf) = producer.current_write_target(false) {
            *buf = value;
        }
        producer.current_write_target(true);
    }

    #[test]
    fn wait_for_times_out_on_empty_queue() {
        let (_producer, mut consumer) = pipeline(2, || 0u32);

        let started = Instant::now();
        assert!(!consumer.wait_for(Duration::from_millis(100)));
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_millis(90), "returned after {elapsed:?}");
        assert!(elapsed < Duration::from_secs(2), "returned after {elapsed:?}");
    }

    #[test]
    fn wait_for_still_waits_once_producer_is_dropped() {
        let (producer, mut consumer) = pipeline(2, || 0u32);
        drop(producer);

        let started = Instant::now();
        assert!(!consumer.wait_for(Duration::from_millis(100)));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(90), "returned after {elapsed:?}");
    }

    #[test]
    fn wait_for_handles_one_frame() {
        let (mut producer, consumer) = pipeline(4, || 0u32);
        commit(&mut producer, 1);
        commit(&mut producer, 2);

        let mut seen = Vec::new();
        let mut consumer = consumer.with_handler(|v: &u32| seen.push(*v));
        assert!(consumer.wait_for(Duration::from_millis(10)));
        assert_eq!(consumer.pending(), 1);
        drop(consumer);
        assert_eq!(seen, [1]);
    }

    #[test]
    fn poll_dispatches_in_fifo_order() {
        let (mut producer, consumer) = pipeline(8, || 0u32);
        for value in 10..15 {
            commit(&mut producer, value);
        }

        let mut seen = Vec::new();
        let mut consumer = consumer.with_handler(|v: &u32| seen.push(*v));
        assert_eq!(consumer.poll(), 5);
        assert_eq!(consumer.poll(), 0);
        drop(consumer);
        assert_eq!(seen, [10, 11, 12, 13, 14]);
    }

    #[test]
    fn handle_queue_bypasses_registered_handler() {
        let (mut producer, consumer) = pipeline(4, || 0u32);
        commit(&mut producer, 3);

        let mut registered = 0;
        let mut consumer = consumer.with_handler(|_: &u32| registered += 1);
        let mut one_off = Vec::new();
        assert_eq!(consumer.handle_queue(|v| one_off.push(*v)), 1);
        drop(consumer);

        assert_eq!(one_off, [3]);
        assert_eq!(registered, 0);
    }

    #[test]
    fn slots_released_after_each_handler() {
        let (mut producer, mut consumer) = pipeline(3, || 0u32);
        commit(&mut producer, 1);
        commit(&mut producer, 2);

        let pool = consumer.pool.clone();
        let mut free_during = Vec::new();
        consumer.handle_queue(|_| free_during.push(pool.available()));

        // One slot stays staged with the producer.
        assert_eq!(free_during, [0, 1]);
        assert_eq!(consumer.stats().free, 2);
    }

    #[test]
    fn panicking_handler_still_releases_slot() {
        let (mut producer, mut consumer) = pipeline(2, || 0u32);
        commit(&mut producer, 1);
        assert!(producer.recycle());

        let result = catch_unwind(AssertUnwindSafe(|| {
            consumer.handle_queue(|_| panic!("handler failure"));
        }));

        assert!(result.is_err());
        assert_eq!(consumer.stats().free, 2);
        assert_eq!(consumer.pending(), 0);
    }

    #[test]
    fn exhaustion_bounds_outstanding_frames() {
        const N: usize = 4;
        let (mut producer, mut consumer) = pipeline(N, || 0u32);

        for value in 0..(N as u32 + 3) {
            commit(&mut producer, value);
            let stats = producer.stats();
            let staged = usize::from(producer.is_staged());
            assert_eq!(stats.free + stats.queued + staged, N);
            assert!(stats.queued + staged <= N);
        }

        let mut seen = Vec::new();
        consumer.handle_queue(|v| seen.push(*v));
        assert_eq!(seen, [0, 1, 2, 3]);
    }

    #[test]
    fn no_slot_is_owned_twice() {
        let (mut producer, mut consumer) = pipeline_with_queue_capacity(5, 3, || 0u32);

        for round in 0..50u32 {
            commit(&mut producer, round);
            if round % 4 == 0 {
                consumer.poll();
            }

            let stats = producer.stats();
            let staged = usize::from(producer.is_staged());
            assert_eq!(stats.free + stats.queued + staged, 5, "round {round}");
        }

        let pool = consumer.pool.clone();
        let mut held: Vec<_> = std::iter::from_fn(|| pool.acquire()).collect();
        held.extend(std::iter::from_fn(|| consumer.queue.try_pop()));
        let indices: HashSet<usize> = held.iter().map(|s| s.index()).collect();
        assert_eq!(indices.len(), held.len());
    }

    #[test]
    fn concurrent_producer_and_consumer() {
        const FRAMES: u32 = 2_000;
        let (mut producer, consumer) = pipeline(10, || 0u32);

        let writer = std::thread::spawn(move || {
            let mut value = 1;
            while value <= FRAMES {
                match producer.current_write_target(false) {
                    Some(buf) => {
                        *buf = value;
                        producer.current_write_target(true);
                        value += 1;
                    }
                    None => std::thread::yield_now(),
                }
            }
            producer
        });

        let mut last = 0;
        let mut in_order = true;
        let mut consumer = consumer.with_handler(move |v: &u32| {
            in_order &= *v == last + 1;
            last = *v;
            assert!(in_order, "frame {v} out of order");
        });
        let mut handled = 0;
        let deadline = Instant::now() + Duration::from_secs(10);
        while handled < FRAMES as usize && Instant::now() < deadline {
            if consumer.wait_for(Duration::from_millis(5)) {
                handled += 1;
            }
        }

        let producer = writer.join().unwrap();
        assert_eq!(handled, FRAMES as usize);
        assert_eq!(producer.stats().committed, u64::from(FRAMES));
    }
}
