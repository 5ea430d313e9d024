use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub(crate) struct Counters {
    committed: AtomicU64,
    dropped_queue_full: AtomicU64,
    drained: AtomicU64,
}

impl Counters {
    pub(crate) fn record_commit(&self) {
        self.committed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_queue_full(&self) {
        self.dropped_queue_full.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_drained(&self) {
        self.drained.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, capacity: usize, free: usize, queued: usize) -> PipelineStats {
        PipelineStats {
            capacity,
            free,
            queued,
            committed: self.committed.load(Ordering::Relaxed),
            dropped_queue_full: self.dropped_queue_full.load(Ordering::Relaxed),
            drained: self.drained.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of a pipeline.
///
/// The gauges are read one after another while both sides may be running,
/// so they need not add up exactly under load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Pool size.
    pub capacity: usize,
    /// Slots in the pool's free list.
    pub free: usize,
    /// Slots waiting in the queue.
    pub queued: usize,
    /// Slots successfully moved into the queue.
    pub committed: u64,
    /// Staged slots discarded because the queue was full.
    pub dropped_queue_full: u64,
    /// Slots popped and handled by the consumer.
    pub drained: u64,
}
