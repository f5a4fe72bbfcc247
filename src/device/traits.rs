//! Completion-based I/O capability
//!
//! The scheduler drives any backend that can register a file plus a buffer
//! arena, submit tagged reads, and block for one completion at a time.
//! Completions may be retrieved in any order relative to submission.

use std::fs::File;
use std::io;

/// One read to submit: destination region, file offset, transfer length.
///
/// `token` is opaque to the backend and comes back verbatim with the
/// completion; the scheduler uses the destination buffer's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    /// Correlation token, echoed in the matching [`Completion`].
    pub token: u64,
    /// Absolute file offset to read from.
    pub offset: u64,
    /// Number of bytes to transfer.
    pub len: u32,
}

/// Outcome of one completed read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    /// The read transferred this many bytes (possibly fewer than requested
    /// at the tail of the file).
    Success(u32),
    /// The read started at or beyond end of file. Benign.
    EndOfFile,
    /// The read failed with this native status code.
    Error(i32),
}

impl CompletionStatus {
    /// Whether the read transferred data.
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, CompletionStatus::Success(_))
    }

    /// Whether the read reported end of file.
    #[inline]
    pub const fn is_end_of_file(&self) -> bool {
        matches!(self, CompletionStatus::EndOfFile)
    }
}

/// One retrieved completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// The correlation token of the originating request.
    pub token: u64,
    /// The read's outcome.
    pub status: CompletionStatus,
}

/// A capability that can run tagged asynchronous reads into registered
/// buffers.
///
/// One session: `register`, any interleaving of `submit`/`wait`, then
/// `deregister` once no read is in flight.
pub trait CompletionIo {
    /// Register the file handle and the buffer arena for zero-copy reads.
    ///
    /// The arena is `region_count` regions of `region_size` bytes starting
    /// at `base`. Request tokens index these regions.
    ///
    /// # Safety
    ///
    /// The arena must stay allocated, and each region unaliased while a
    /// read into it is in flight, until `deregister` returns (or the
    /// backend is dropped).
    unsafe fn register(
        &mut self,
        file: &File,
        base: *mut u8,
        region_size: usize,
        region_count: usize,
    ) -> io::Result<()>;

    /// Submit one read. Never blocks for completion.
    fn submit(&mut self, request: ReadRequest) -> io::Result<()>;

    /// Block until one completion is available and return it.
    fn wait(&mut self) -> io::Result<Completion>;

    /// Release the registration. No read may be in flight.
    fn deregister(&mut self) -> io::Result<()>;
}
