//! Lock-free synchronization primitives
//!
//! The pieces underneath the buffer pool: a parking wait/notify cell, an
//! atomic presence slot, a power-of-two ring of slots, and the bounded
//! multi-producer/single-consumer queue built from them.

mod notify;
mod queue;
mod ring;
mod slot;

pub use notify::Signal;
pub use queue::BoundedQueue;
pub use ring::RingBuffer;
pub use slot::Slot;
