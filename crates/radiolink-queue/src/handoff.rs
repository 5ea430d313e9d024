use std::sync::Arc;

use tracing::{debug, trace};

use crate::pool::{Pool, Slot};
use crate::queue::QueueProducer;
use crate::stats::{Counters, PipelineStats};

/// Producer side of a pipeline: the buffer currently being filled.
///
/// At most one slot is staged at a time. Committing moves the staged slot
/// into the queue and stages a fresh one; the producer never blocks and never
/// holds more than the staged slot.
pub struct HandoffBuffer<T> {
    pool: Pool<T>,
    queue: QueueProducer<T>,
    staged: Option<Slot<T>>,
    counters: Arc<Counters>,
}

impl<T: Send + 'static> HandoffBuffer<T> {
    pub(crate) fn new(pool: Pool<T>, queue: QueueProducer<T>, counters: Arc<Counters>) -> Self {
        Self {
            pool,
            queue,
            staged: None,
            counters,
        }
    }

    /// The buffer to write into next.
    ///
    /// With `commit`, the staged buffer (if any) is first pushed onto the
    /// queue; if the queue is full it is released instead and its contents are
    /// lost. Without `commit`, the staged buffer is returned untouched so it
    /// can be filled over several calls.
    ///
    /// Returns `None` only when nothing is staged and the pool is empty.
    pub fn current_write_target(&mut self, commit: bool) -> Option<&mut T> {
        if commit {
            if let Some(slot) = self.staged.take() {
                let index = slot.index();
                match self.queue.try_push(slot) {
                    Ok(()) => {
                        self.counters.record_commit();
                        trace!(slot = index, "slot committed");
                    }
                    Err(rejected) => {
                        self.counters.record_queue_full();
                        debug!(slot = index, "queue full; staged frame dropped");
                        drop(rejected);
                    }
                }
            }
        }

        if self.staged.is_none() {
            self.staged = self.pool.acquire();
        }
        self.staged.as_deref_mut()
    }

    /// Release the staged buffer back to the pool without committing it.
    ///
    /// Returns whether a buffer was staged.
    pub fn recycle(&mut self) -> bool {
        match self.staged.take() {
            Some(slot) => {
                trace!(slot = slot.index(), "staged slot recycled");
                true
            }
            None => false,
        }
    }

    /// Whether a buffer is currently staged.
    pub fn is_staged(&self) -> bool {
        self.staged.is_some()
    }

    pub fn stats(&self) -> PipelineStats {
        self.counters
            .snapshot(self.pool.capacity(), self.pool.available(), self.queue.len())
    }
}
