//! Atomic presence cell
//!
//! A `Slot` holds zero or one value behind an atomic presence flag. The
//! value write happens-before any observer of the flag: `put` publishes
//! with a release store, takers observe with an acquire load.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, Ordering};

use super::Signal;

/// An atomic cell holding zero or one `T`.
///
/// # Contract
///
/// At any instant at most one thread may be writing (`put`) and at most one
/// thread may be reading (`try_take` / `wait_and_take`). The enclosing
/// [`BoundedQueue`](super::BoundedQueue) enforces this: a producer owns the
/// slot from index reservation until its `put` completes, and the single
/// consumer owns it from observing presence until the take resets it.
/// Violations are diagnosed only under debug assertions.
pub struct Slot<T> {
    value: UnsafeCell<MaybeUninit<T>>,
    full: AtomicBool,
    signal: Signal,
}

// Safety: the value cell is only accessed by the unique writer before the
// release store of `full`, and by the unique reader after the acquire load.
unsafe impl<T: Send> Send for Slot<T> {}
unsafe impl<T: Send> Sync for Slot<T> {}

impl<T> Slot<T> {
    /// Create an empty slot.
    pub const fn new() -> Self {
        Self {
            value: UnsafeCell::new(MaybeUninit::uninit()),
            full: AtomicBool::new(false),
            signal: Signal::new(),
        }
    }

    /// Whether a value is present.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.full.load(Ordering::Acquire)
    }

    /// Move `value` in and mark presence with release ordering.
    ///
    /// Precondition: the slot is empty. Filling a full slot overwrites the
    /// stored value silently in release builds.
    pub fn put(&self, value: T) {
        self.put_ordered(value, Ordering::Release);
    }

    /// Move `value` in and mark presence with the given memory order.
    ///
    /// `order` applies to the presence store; anything weaker than release
    /// leaves the value write unpublished to acquire-side takers.
    pub fn put_ordered(&self, value: T, order: Ordering) {
        debug_assert!(
            !self.full.load(Ordering::Relaxed),
            "put into a full slot (capacity contract violated)"
        );
        unsafe {
            (*self.value.get()).write(value);
        }
        self.full.store(true, order);
        self.signal.notify();
    }

    /// Take the value if present, resetting the slot to empty.
    pub fn try_take(&self) -> Option<T> {
        if !self.full.load(Ordering::Acquire) {
            return None;
        }
        // Safety: presence observed under acquire, so the writer's value
        // write is visible, and the single-reader contract means nobody
        // else can reset the flag between the load and here.
        let value = unsafe { (*self.value.get()).assume_init_read() };
        self.full.store(false, Ordering::Release);
        Some(value)
    }

    /// Park until a value is present, then take it.
    ///
    /// Returns the stored value exactly once per `put`; the cell is never
    /// read again after presence is reset.
    pub fn wait_and_take(&self) -> T {
        loop {
            let seen = self.signal.generation();
            if let Some(value) = self.try_take() {
                return value;
            }
            self.signal.wait_past(seen);
        }
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Slot<T> {
    fn drop(&mut self) {
        if *self.full.get_mut() {
            // Safety: presence set means the value was fully written.
            unsafe {
                (*self.value.get()).assume_init_drop();
            }
        }
    }
}
