//! Aligned buffer pool
//!
//! One aligned allocation carved into equal regions, cycled through the
//! bounded queue as move-only ownership tokens. The token protocol is the
//! only thing protecting the memory: whoever holds a region's token (the
//! pool, an in-flight read, or a sink callback) owns it exclusively.

mod arena;
mod buffer_pool;

pub use arena::{BufferArena, BufferId};
pub use buffer_pool::{BufferPool, BufferToken};
