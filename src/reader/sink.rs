//! Chunk sinks
//!
//! Completed byte ranges are handed to a sink as they arrive, in
//! completion order rather than offset order. A production sink is a record/line
//! parser that reassembles ranges by offset and buffers partial trailing
//! records across calls; that lives outside this crate. The reference sink
//! here merely reports progress.

/// Consumer of completed byte ranges.
pub trait ChunkSink {
    /// Called once per successful read.
    ///
    /// `offset` is the file position `bytes` starts at; `total_size` is the
    /// file size. Reconstruction must key on `offset`, never on arrival
    /// order.
    fn on_chunk(&mut self, bytes: &[u8], offset: u64, total_size: u64);
}

/// Adapter turning a closure into a [`ChunkSink`].
pub struct FnSink<F>(F);

impl<F: FnMut(&[u8], u64, u64)> FnSink<F> {
    /// Wrap `f`; it is called once per successful read.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F: FnMut(&[u8], u64, u64)> ChunkSink for FnSink<F> {
    fn on_chunk(&mut self, bytes: &[u8], offset: u64, total_size: u64) {
        (self.0)(bytes, offset, total_size)
    }
}

/// Reference sink: logs progress percentage at decile milestones.
#[derive(Debug)]
pub struct ProgressSink {
    bytes_seen: u64,
    next_decile: u64,
}

impl Default for ProgressSink {
    fn default() -> Self {
        Self {
            bytes_seen: 0,
            next_decile: 1,
        }
    }
}

impl ProgressSink {
    /// Create a progress sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bytes delivered so far.
    pub fn bytes_seen(&self) -> u64 {
        self.bytes_seen
    }
}

impl ChunkSink for ProgressSink {
    fn on_chunk(&mut self, bytes: &[u8], _offset: u64, total_size: u64) {
        self.bytes_seen += bytes.len() as u64;
        if total_size == 0 {
            return;
        }
        let percent = self.bytes_seen * 100 / total_size;
        while percent >= self.next_decile * 10 {
            if tracing::enabled!(tracing::Level::INFO) {
                tracing::info!(percent = self.next_decile * 10, "read progress");
            }
            self.next_decile += 1;
            if self.next_decile > 10 {
                return;
            }
        }
    }
}
