//! Bounded, zero-copy hand-off of receive buffers between two threads.
//!
//! A fixed set of `N` buffers is allocated once. The producer fills one
//! buffer at a time through a [`HandoffBuffer`] and commits it into a bounded
//! FIFO; the consumer pops committed buffers through a [`Drain`], runs a
//! handler over each, and the buffer goes straight back to the pool.
//!
//! Buffers move between the two sides as [`Slot`] handles, which own a boxed
//! buffer. A push or pop moves a pointer; buffer contents are never copied.
//! Every buffer is always in exactly one place: the pool's free list, the
//! producer's staging area, the queue, or the consumer's hand.
//!
//! ```
//! use std::time::Duration;
//!
//! let (mut producer, mut consumer) = radiolink_queue::pipeline(4, || [0u8; 8]);
//!
//! if let Some(buf) = producer.current_write_target(false) {
//!     buf[0] = 42;
//! }
//! producer.current_write_target(true);
//!
//! let mut seen = Vec::new();
//! consumer.handle_queue(|buf: &[u8; 8]| seen.push(buf[0]));
//! assert_eq!(seen, [42]);
//! assert!(!consumer.wait_for(Duration::from_millis(1)));
//! ```

pub mod drain;
pub mod handoff;
pub mod pool;
pub mod queue;
pub mod stats;

pub use drain::{Discard, Drain, Handler};
pub use handoff::HandoffBuffer;
pub use pool::{Pool, Slot};
pub use queue::{QueueConsumer, QueueProducer};
pub use stats::PipelineStats;

use std::sync::Arc;

use stats::Counters;

/// Build a producer/consumer pair over `capacity` pre-allocated buffers.
///
/// The queue holds as many entries as the pool has slots.
///
/// # Panics
///
/// Panics if `capacity` is 0.
pub fn pipeline<T, F>(capacity: usize, factory: F) -> (HandoffBuffer<T>, Drain<T>)
where
    T: Send + 'static,
    F: FnMut() -> T,
{
    pipeline_with_queue_capacity(capacity, capacity, factory)
}

/// Like [`pipeline`], with a queue shorter than the pool.
///
/// A short queue makes the queue-full path reachable: with equal capacities
/// the pool always runs dry first.
///
/// # Panics
///
/// Panics unless `0 < queue_capacity <= pool_capacity`.
pub fn pipeline_with_queue_capacity<T, F>(
    pool_capacity: usize,
    queue_capacity: usize,
    factory: F,
) -> (HandoffBuffer<T>, Drain<T>)
where
    T: Send + 'static,
    F: FnMut() -> T,
{
    assert!(
        queue_capacity > 0 && queue_capacity <= pool_capacity,
        "queue capacity must be in 1..=pool capacity"
    );
    let pool = Pool::new(pool_capacity, factory);
    let (tx, rx) = queue::bounded(queue_capacity);
    let counters = Arc::new(Counters::default());

    let producer = HandoffBuffer::new(pool.clone(), tx, Arc::clone(&counters));
    let consumer = Drain::new(pool, rx, counters);
    (producer, consumer)
}
