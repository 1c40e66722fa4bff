//! Bounded FIFO buffer with blocking and bounded produce/consume.
//!
//! The buffer is the backpressure primitive everything else composes:
//! producers park while it is full, consumers park while it is empty,
//! and both sides re-check their predicate after every wake. Two
//! condition variables keep producer and consumer wakeups separate:
//!
//! - `space_available`: signalled after a consume frees a slot
//! - `item_available`: signalled after a produce fills one

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::BufferTimeout;

#[derive(Debug)]
struct BufferInner<T> {
    queue: VecDeque<T>,
    capacity: usize,
}

/// Fixed-capacity FIFO buffer shared between threads.
///
/// Items come out in exactly the order they went in; no interleaving of
/// producers and consumers can lose or duplicate an item.
#[derive(Debug)]
pub struct BoundedBuffer<T> {
    inner: Mutex<BufferInner<T>>,
    space_available: Condvar,
    item_available: Condvar,
}

impl<T> BoundedBuffer<T> {
    /// Creates a buffer holding at most `capacity` items.
    ///
    /// # Panics
    /// Panics if `capacity == 0`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "buffer capacity must be non-zero");
        Self {
            inner: Mutex::new(BufferInner {
                queue: VecDeque::with_capacity(capacity),
                capacity,
            }),
            space_available: Condvar::new(),
            item_available: Condvar::new(),
        }
    }

    /// Inserts `item`, blocking while the buffer is full.
    ///
    /// Wakes one waiting consumer.
    pub fn produce(&self, item: T) {
        let mut inner = self.inner.lock().expect("buffer lock poisoned");
        while inner.queue.len() == inner.capacity {
            inner = self
                .space_available
                .wait(inner)
                .expect("buffer lock poisoned");
        }
        inner.queue.push_back(item);
        drop(inner);
        self.item_available.notify_one();
    }

    /// Removes and returns the oldest item, blocking while empty.
    ///
    /// Wakes one waiting producer.
    pub fn consume(&self) -> T {
        let mut inner = self.inner.lock().expect("buffer lock poisoned");
        loop {
            if let Some(item) = inner.queue.pop_front() {
                drop(inner);
                self.space_available.notify_one();
                return item;
            }
            inner = self
                .item_available
                .wait(inner)
                .expect("buffer lock poisoned");
        }
    }

    /// Inserts `item` unless the buffer stays full for `timeout`.
    ///
    /// On expiry the buffer is unchanged and the item is handed back
    /// inside the error.
    pub fn try_produce(&self, item: T, timeout: Duration) -> Result<(), BufferTimeout<T>> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock().expect("buffer lock poisoned");
        while inner.queue.len() == inner.capacity {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(BufferTimeout(item));
            }
            let (guard, _) = self
                .space_available
                .wait_timeout(inner, remaining)
                .expect("buffer lock poisoned");
            inner = guard;
        }
        inner.queue.push_back(item);
        drop(inner);
        self.item_available.notify_one();
        Ok(())
    }

    /// Removes the oldest item unless the buffer stays empty for
    /// `timeout`. Returns `None` on expiry, leaving the buffer unchanged.
    pub fn try_consume(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock().expect("buffer lock poisoned");
        loop {
            if let Some(item) = inner.queue.pop_front() {
                drop(inner);
                self.space_available.notify_one();
                return Some(item);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            let (guard, _) = self
                .item_available
                .wait_timeout(inner, remaining)
                .expect("buffer lock poisoned");
            inner = guard;
        }
    }

    /// Number of items currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("buffer lock poisoned").queue.len()
    }

    /// Returns true if no items are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if every slot is occupied.
    #[must_use]
    pub fn is_full(&self) -> bool {
        let inner = self.inner.lock().expect("buffer lock poisoned");
        inner.queue.len() == inner.capacity
    }

    /// The fixed capacity given at construction.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.lock().expect("buffer lock poisoned").capacity
    }
}
