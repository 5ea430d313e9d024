use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::pool::Slot;

/// Create a bounded FIFO of slots with room for `capacity` entries.
///
/// The two halves are not `Clone`: there is one pushing side and one popping
/// side.
pub fn bounded<T>(capacity: usize) -> (QueueProducer<T>, QueueConsumer<T>) {
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    (
        QueueProducer { tx, capacity },
        QueueConsumer { rx, capacity },
    )
}

/// Pushing half of the slot queue.
pub struct QueueProducer<T> {
    tx: Sender<Slot<T>>,
    capacity: usize,
}

impl<T> QueueProducer<T> {
    /// Push without blocking.
    ///
    /// When the queue is full, or the consumer is gone, the queue is left
    /// unchanged and the slot is handed back.
    pub fn try_push(&self, slot: Slot<T>) -> Result<(), Slot<T>> {
        self.tx.try_send(slot).map_err(|err| match err {
            TrySendError::Full(slot) | TrySendError::Disconnected(slot) => slot,
        })
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.tx.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Popping half of the slot queue.
pub struct QueueConsumer<T> {
    rx: Receiver<Slot<T>>,
    capacity: usize,
}

impl<T> QueueConsumer<T> {
    /// Pop the oldest entry without blocking.
    pub fn try_pop(&self) -> Option<Slot<T>> {
        self.rx.try_recv().ok()
    }

    /// Pop the oldest entry, waiting up to `timeout` for one to arrive.
    ///
    /// Returns `None` on timeout. Once the producer is gone and the queue is
    /// empty nothing can arrive, but the call still takes the full `timeout`
    /// so polling loops do not spin.
    pub fn pop_wait(&self, timeout: Duration) -> Option<Slot<T>> {
        let deadline = Instant::now() + timeout;
        match self.rx.recv_deadline(deadline) {
            Ok(slot) => Some(slot),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(deadline.saturating_duration_since(Instant::now()));
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
