//! oxiread - overlapped direct-I/O file reading
//!
//! Reads very large files from block storage by overlapping device I/O
//! with consumption:
//! - a small fixed pool of hardware-aligned buffers cycled through a
//!   lock-free, externally-bounded MPSC queue
//! - a completion-driven scheduler that derives the device's alignment
//!   constraints, keeps `num_buffers - 1` reads in flight, and reuses
//!   buffers as completions arrive
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use oxiread::{read_file, ReaderConfig};
//! use oxiread::reader::FnSink;
//!
//! let mut sink = FnSink::new(|bytes: &[u8], offset: u64, total: u64| {
//!     // ranges arrive in completion order; key on `offset`
//! });
//! let summary = read_file("huge.obj", ReaderConfig::default(), &mut sink)?;
//! assert_eq!(summary.bytes_read, summary.file_size);
//! ```
//!
//! Downstream record parsing, CLI handling and progress display live
//! outside this crate; the [`reader::ProgressSink`] reference sink only
//! logs percentages.

#![warn(missing_docs)]
#![allow(dead_code)]

pub mod config;
pub mod device;
pub mod error;
pub mod pool;
pub mod reader;
pub mod sync;
mod utility;

// Re-exports for convenience
pub use config::ReaderConfig;
pub use error::{ErrorKind, ReadError, Result};
pub use reader::{read_file, FileReader, StreamSummary};

/// Constants used throughout the library
pub mod constants {
    /// Smallest usable buffer pool: one read in flight, one buffer free.
    pub const MIN_BUFFERS: usize = 2;

    /// Sector size assumed when the device cannot be probed.
    pub const FALLBACK_SECTOR_SIZE: u64 = crate::device::FALLBACK_SECTOR_SIZE;
}

/// Utility for size literals (e.g. 2 * MIB)
pub mod size {
    /// 1 KiB in bytes
    pub const KIB: u64 = 1024;
    /// 1 MiB in bytes
    pub const MIB: u64 = 1024 * KIB;
    /// 1 GiB in bytes
    pub const GIB: u64 = 1024 * MIB;
}

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::ReaderConfig;
    pub use crate::device::{Completion, CompletionIo, CompletionStatus, ReadRequest};
    pub use crate::error::{ErrorKind, ReadError, Result};
    pub use crate::pool::{BufferPool, BufferToken};
    pub use crate::reader::{read_file, ChunkSink, FileReader, FnSink, ProgressSink, StreamSummary};
}
