//! Blocking wait/notify cell
//!
//! An eventcount: a generation counter paired with a condvar. Waiters park
//! instead of spinning, and a notification between reading the generation
//! and parking is never lost.

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::{Condvar, Mutex};

/// A cell supporting `wait(seen-generation)` and `notify()`.
///
/// The protocol for waiting on an external condition:
///
/// 1. read the current generation,
/// 2. check the condition; if satisfied, done,
/// 3. `wait_past(seen)`: parks until the generation moves past the value
///    read in step 1.
///
/// A notifier that publishes state and then calls [`Signal::notify`] either
/// bumps the generation before step 1 (the waiter re-checks and sees the
/// state) or after (step 3 returns immediately).
pub struct Signal {
    generation: AtomicU32,
    lock: Mutex<()>,
    cond: Condvar,
}

impl Signal {
    /// Create a new signal.
    pub const fn new() -> Self {
        Self {
            generation: AtomicU32::new(0),
            lock: Mutex::new(()),
            cond: Condvar::new(),
        }
    }

    /// Read the current generation.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation.load(Ordering::Acquire)
    }

    /// Wake all parked waiters.
    ///
    /// Call after the state the waiters are checking has been published.
    pub fn notify(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        // Taking the lock orders this notification with a waiter that read
        // the generation but has not yet parked.
        drop(self.lock.lock());
        self.cond.notify_all();
    }

    /// Park until the generation moves past `seen`.
    pub fn wait_past(&self, seen: u32) {
        let mut guard = self.lock.lock();
        while self.generation.load(Ordering::Acquire) == seen {
            self.cond.wait(&mut guard);
        }
    }

    /// Park until `cond` returns true, rechecking after every notification.
    pub fn wait_until(&self, mut cond: impl FnMut() -> bool) {
        loop {
            let seen = self.generation();
            if cond() {
                return;
            }
            self.wait_past(seen);
        }
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}
