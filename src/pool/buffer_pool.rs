//! Buffer pool and ownership tokens
//!
//! A [`BoundedQueue`] specialized to [`BufferId`]s. The pool starts full;
//! every id cycles pool → token → (optionally in-flight) → pool. Capacity
//! is exactly the region count, so the queue's external bound holds by
//! construction: an id can only be pushed by the token that owns it.

use crate::pool::{BufferArena, BufferId};
use crate::sync::BoundedQueue;

#[cfg(debug_assertions)]
use std::sync::atomic::{AtomicBool, Ordering};

/// Fixed pool of equal-sized aligned buffers.
///
/// `pop` is single-consumer (see [`BoundedQueue`]); returning buffers via
/// token drops and [`BufferPool::reacquire`] is safe from any thread.
pub struct BufferPool {
    arena: BufferArena,
    free: BoundedQueue<BufferId>,
    /// Tracks ids currently outside the queue; contract violations are
    /// diagnosed here and nowhere else.
    #[cfg(debug_assertions)]
    checked_out: Box<[AtomicBool]>,
}

impl BufferPool {
    /// Allocate the arena and fill the pool with every region id.
    ///
    /// Returns `None` when the arena allocation fails.
    pub fn new(num_buffers: usize, buffer_size: usize, alignment: usize) -> Option<Self> {
        let arena = BufferArena::new(num_buffers, buffer_size, alignment)?;
        let free = BoundedQueue::with_capacity(num_buffers);
        for i in 0..num_buffers as u32 {
            free.push(BufferId::new(i));
        }
        Some(Self {
            arena,
            free,
            #[cfg(debug_assertions)]
            checked_out: (0..num_buffers).map(|_| AtomicBool::new(false)).collect(),
        })
    }

    /// The backing arena.
    #[inline]
    pub fn arena(&self) -> &BufferArena {
        &self.arena
    }

    /// Number of buffers in the pool.
    #[inline]
    pub fn num_buffers(&self) -> usize {
        self.arena.region_count()
    }

    /// Size of each buffer.
    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.arena.region_size()
    }

    /// Number of buffers currently in the queue (racy snapshot).
    pub fn available(&self) -> usize {
        self.free.outstanding() as usize
    }

    /// Take exclusive ownership of one buffer, parking until one is free.
    ///
    /// Single logical consumer only.
    pub fn pop(&self) -> BufferToken<'_> {
        let id = self.free.pop();
        #[cfg(debug_assertions)]
        {
            let was = self.checked_out[id.index()].swap(true, Ordering::AcqRel);
            debug_assert!(!was, "buffer {} popped while checked out", id.index());
        }
        BufferToken {
            id,
            pool: Some(self),
        }
    }

    /// Re-wrap a raw id obtained from a completion into a managed token.
    ///
    /// The id must have been handed out through [`BufferToken::release`]
    /// and not yet returned; reacquiring anything else is a contract
    /// violation (debug-asserted).
    pub fn reacquire(&self, id: BufferId) -> BufferToken<'_> {
        #[cfg(debug_assertions)]
        debug_assert!(
            self.checked_out[id.index()].load(Ordering::Acquire),
            "reacquired buffer {} that is not checked out",
            id.index()
        );
        BufferToken {
            id,
            pool: Some(self),
        }
    }

    fn push_back(&self, id: BufferId) {
        #[cfg(debug_assertions)]
        {
            let was = self.checked_out[id.index()].swap(false, Ordering::AcqRel);
            debug_assert!(was, "buffer {} returned twice", id.index());
        }
        self.free.push(id);
    }
}

/// Move-only handle granting exclusive, scoped access to one buffer.
///
/// Dropping the token returns the buffer to the pool. [`BufferToken::release`]
/// disarms the auto-return and hands the raw id out, for when ownership
/// must pass into an in-flight asynchronous operation; a later
/// [`BufferPool::reacquire`] restores the single-owner invariant.
///
/// Double release is unrepresentable: `release` consumes the token.
pub struct BufferToken<'a> {
    id: BufferId,
    pool: Option<&'a BufferPool>,
}

impl BufferToken<'_> {
    /// The buffer's id.
    #[inline]
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Read access to the buffer.
    pub fn as_slice(&self) -> &[u8] {
        // Safety: a live token is the region's unique owner.
        unsafe { self.pool.expect("released token").arena.region(self.id) }
    }

    /// Write access to the buffer.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // Safety: a live token is the region's unique owner, and &mut self
        // makes this the only view.
        unsafe { self.pool.expect("released token").arena.region_mut(self.id) }
    }

    /// Hand the raw id out and disarm the auto-return.
    pub fn release(mut self) -> BufferId {
        self.pool = None;
        self.id
    }
}

impl Drop for BufferToken<'_> {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.push_back(self.id);
        }
    }
}
