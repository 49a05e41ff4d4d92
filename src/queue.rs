//! A fixed-capacity ring shared between producer and consumer threads.
//!
//! The ring tracks two logical indices, `start` and `end`, that only ever grow and are mapped
//! into the buffer modulo its capacity `C`. The queue is empty when `start == end` and full when
//! `end - start == C - 1`: one slot always stays unused so that the two indices alone tell the
//! full and empty states apart.
//!
//! Producers block on the `not_full` condition while the ring is full, consumers block on
//! `not_empty` while it is empty. Every index mutation happens under the single mutex, so any
//! number of producers and consumers may share one queue.

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::config::MAX_QUEUE_CAPACITY;
use crate::{Error, Result};

pub struct BoundedQueue<T> {
    ring: Mutex<Ring<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
}

struct Ring<T> {
    slots: Vec<Option<T>>,
    start: usize,
    end: usize,
    closed: bool,
}

impl<T> Ring<T> {
    #[inline]
    fn len(&self) -> usize {
        self.end - self.start
    }
}

impl<T> BoundedQueue<T> {
    /// Creates an empty queue over `capacity` slots, of which `capacity - 1` are usable.
    ///
    /// `capacity` must lie in `2..=MAX_QUEUE_CAPACITY`.
    pub fn new(capacity: usize) -> Result<Self> {
        if !(2..=MAX_QUEUE_CAPACITY).contains(&capacity) {
            return Err(Error::InvalidCapacity(capacity));
        }
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Ok(Self {
            ring: Mutex::new(Ring {
                slots,
                start: 0,
                end: 0,
                closed: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity,
        })
    }

    /// Appends `item`, blocking while the queue is full.
    ///
    /// Fails only once the queue has been [closed](Self::close); the item is dropped then.
    pub fn enqueue(&self, item: T) -> Result<()> {
        let mut ring = self.ring.lock();
        while ring.len() == self.capacity - 1 && !ring.closed {
            self.not_full.wait(&mut ring);
        }
        if ring.closed {
            return Err(Error::QueueClosed);
        }
        let slot = ring.end % self.capacity;
        ring.slots[slot] = Some(item);
        ring.end += 1;
        self.not_empty.notify_one();
        Ok(())
    }

    /// Removes the oldest item, blocking while the queue is empty.
    ///
    /// A closed queue still hands out whatever it buffered before closing, and fails with
    /// [`Error::QueueClosed`] once drained.
    pub fn dequeue(&self) -> Result<T> {
        let mut ring = self.ring.lock();
        loop {
            if ring.len() > 0 {
                break;
            }
            if ring.closed {
                return Err(Error::QueueClosed);
            }
            self.not_empty.wait(&mut ring);
        }
        let slot = ring.start % self.capacity;
        let item = ring.slots[slot].take();
        ring.start += 1;
        self.not_full.notify_one();
        // Occupied slots are always `Some`.
        item.ok_or(Error::QueueClosed)
    }

    /// Refuses further enqueues and wakes every blocked producer and consumer.
    pub fn close(&self) {
        let mut ring = self.ring.lock();
        if !ring.closed {
            ring.closed = true;
            debug!(pending = ring.len(), "queue closed");
        }
        drop(ring);
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.ring.lock().closed
    }

    pub fn len(&self) -> usize {
        self.ring.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity - 1
    }

    /// Ring size, one more than the number of items the queue can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
