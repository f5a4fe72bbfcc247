//! Externally-bounded multi-producer/single-consumer queue
//!
//! Producers reserve a unique slot index with a fetch-add on `tail`, write
//! the slot, and wake the consumer once the write is visible. The single
//! consumer walks `head` behind `tail`, taking values strictly in
//! reservation order.
//!
//! The queue does not enforce its own capacity. The caller's protocol must
//! keep outstanding items at or below the capacity it was built with;
//! exceeding it overwrites a live slot silently in release builds (a debug
//! assertion catches it otherwise). Under that contract `push` never blocks
//! and never fails.

use std::sync::atomic::{AtomicU64, Ordering};

use super::{RingBuffer, Signal};

/// Lock-free MPSC queue, correct under an externally-enforced bound.
///
/// # Consumer contract
///
/// `pop` must be called by one logical consumer at a time. Handing the
/// consumer role to another thread is sound provided the handoff itself
/// synchronizes (e.g. a join or a mutex); concurrent `pop` calls are a
/// contract violation.
pub struct BoundedQueue<T> {
    ring: RingBuffer<T>,
    /// Total reservations. Shared by producers.
    tail: AtomicU64,
    /// Total completed pops. Written only by the single consumer.
    head: AtomicU64,
    /// Wakes the consumer parked on an empty queue.
    not_empty: Signal,
    capacity: usize,
}

impl<T: Send> BoundedQueue<T> {
    /// Create a queue for at most `capacity` outstanding values.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ring: RingBuffer::with_capacity(capacity),
            tail: AtomicU64::new(0),
            head: AtomicU64::new(0),
            not_empty: Signal::new(),
            capacity,
        }
    }

    /// The externally-enforced bound this queue was built for.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of reserved-but-unpopped values at this instant.
    ///
    /// Racy by nature; exact only when producers and the consumer are quiet.
    pub fn outstanding(&self) -> u64 {
        let head = self.head.load(Ordering::Acquire);
        self.tail.load(Ordering::Acquire).saturating_sub(head)
    }

    /// Enqueue a value. Never blocks, never fails.
    ///
    /// Reserves a unique index, writes the slot, then wakes the consumer.
    /// Caller protocol must guarantee the capacity bound.
    pub fn push(&self, value: T) {
        let index = self.tail.fetch_add(1, Ordering::AcqRel);
        debug_assert!(
            index.wrapping_sub(self.head.load(Ordering::Acquire)) < self.capacity as u64,
            "queue capacity {} exceeded",
            self.capacity
        );
        self.ring.slot(index).put(value);
        self.not_empty.notify();
    }

    /// Dequeue the next value in reservation order. Single consumer only.
    ///
    /// Parks when `head == tail`. When a slot is reserved but not yet
    /// written, parks on that slot's presence flag: a slow producer holding
    /// an earlier reservation stalls the consumer even if later producers
    /// finish sooner. That is the ordering guarantee, not a defect.
    pub fn pop(&self) -> T {
        let head = self.head.load(Ordering::Relaxed);
        self.not_empty
            .wait_until(|| head != self.tail.load(Ordering::Acquire));
        let value = self.ring.slot(head).wait_and_take();
        self.head.store(head + 1, Ordering::Relaxed);
        value
    }
}
