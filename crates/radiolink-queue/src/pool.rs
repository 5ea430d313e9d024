use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crossbeam_queue::ArrayQueue;
use tracing::{trace, warn};

struct Shared<T> {
    free: ArrayQueue<(usize, Box<T>)>,
    capacity: usize,
}

impl<T> Shared<T> {
    fn give_back(&self, index: usize, item: Box<T>) {
        // The free list holds exactly `capacity` entries, so this only fails if
        // a slot was somehow minted outside the pool.
        if self.free.push((index, item)).is_err() {
            warn!(slot = index, "free list full on release; slot discarded");
        }
    }
}

/// A fixed-capacity pool of pre-allocated buffers.
///
/// All `capacity` buffers are created up front. [`acquire`](Pool::acquire)
/// never allocates and never blocks: when every buffer is on loan it returns
/// `None`. Cloning a `Pool` yields another handle to the same buffers.
pub struct Pool<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> Pool<T> {
    /// Pre-allocate `capacity` buffers using `factory`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize, mut factory: impl FnMut() -> T) -> Self {
        assert!(capacity > 0, "pool capacity must be greater than 0");

        let free = ArrayQueue::new(capacity);
        for index in 0..capacity {
            // Cannot fail: the queue was sized for exactly these entries.
            let _ = free.push((index, Box::new(factory())));
        }
        Self {
            shared: Arc::new(Shared { free, capacity }),
        }
    }

    /// Take a free buffer. Its contents are whatever the last user left.
    pub fn acquire(&self) -> Option<Slot<T>> {
        let (index, item) = self.shared.free.pop()?;
        trace!(slot = index, "slot acquired");
        Some(Slot {
            index,
            item: Some(item),
            pool: Arc::clone(&self.shared),
        })
    }
}

impl<T> Pool<T> {
    /// Total number of buffers.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Buffers currently free.
    pub fn available(&self) -> usize {
        self.shared.free.len()
    }

    /// Buffers currently on loan (staged, queued or being handled).
    pub fn outstanding(&self) -> usize {
        self.shared.capacity - self.available()
    }
}

impl<T> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("capacity", &self.capacity())
            .field("available", &self.available())
            .finish()
    }
}

/// Exclusive ownership of one pooled buffer.
///
/// A `Slot` cannot be cloned. Dropping it returns the buffer to its pool, so
/// each loan is released exactly once, including during unwinding.
pub struct Slot<T> {
    index: usize,
    item: Option<Box<T>>,
    pool: Arc<Shared<T>>,
}

impl<T> Slot<T> {
    /// Position of this buffer within its pool, stable for the pool's life.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Return the buffer to the pool now.
    pub fn release(self) {
        drop(self);
    }
}

impl<T> Deref for Slot<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.item {
            Some(item) => item,
            None => unreachable!("slot accessed after release"),
        }
    }
}

impl<T> DerefMut for Slot<T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.item {
            Some(item) => item,
            None => unreachable!("slot accessed after release"),
        }
    }
}

impl<T> Drop for Slot<T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            trace!(slot = self.index, "slot released");
            self.pool.give_back(self.index, item);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("index", &self.index)
            .field("item", &self.item)
            .finish()
    }
}
