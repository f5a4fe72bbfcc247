//! Completion-driven read scheduler
//!
//! Opens a file, derives its device geometry, then streams it through a
//! fixed buffer pool: an initial wave of `num_buffers - 1` reads, and one
//! fresh submission per successful completion while unread data remains.
//! Exactly one buffer stays unissued at any instant, which is what bounds
//! the in-flight count and keeps the pool's capacity invariant external.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::config::ReaderConfig;
use crate::device::{probe_sector_size, CompletionIo, CompletionStatus, DeviceGeometry, ReadRequest, ThreadedIo};
use crate::error::{ErrorKind, IoResultExt, ReadError, Result};
use crate::pool::{BufferId, BufferPool};
use crate::reader::ChunkSink;

/// Lifecycle of one read session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No file opened yet.
    Idle,
    /// File opened, geometry derived.
    Opened,
    /// Buffers registered, reads in flight.
    Streaming,
    /// All data delivered; reaping leftover completions.
    Draining,
    /// Arena released, session over.
    Closed,
}

/// Totals for one completed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    /// Size of the file in bytes.
    pub file_size: u64,
    /// Bytes delivered to the sink. Equals `file_size` on success.
    pub bytes_read: u64,
    /// Total reads submitted, including any that reported end of file.
    pub reads_issued: u64,
}

/// An opened file with derived geometry, ready to stream once.
///
/// `stream` consumes the reader: a session cannot be replayed.
#[derive(Debug)]
pub struct FileReader {
    file: File,
    path: PathBuf,
    file_size: u64,
    geometry: DeviceGeometry,
    config: ReaderConfig,
}

impl FileReader {
    /// Open `path` and derive the device geometry. `Idle → Opened`.
    pub fn open(path: impl AsRef<Path>, config: ReaderConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ReadError::new(ErrorKind::InvalidConfig, io::Error::new(io::ErrorKind::InvalidInput, e.to_string())))?;

        let path = path.as_ref().to_path_buf();
        tracing::debug!(state = ?SessionState::Idle, path = %path.display(), "opening");

        let mut options = OpenOptions::new();
        options.read(true);
        #[cfg(target_os = "linux")]
        if config.direct {
            use std::os::unix::fs::OpenOptionsExt;
            options.custom_flags(libc::O_DIRECT);
        }
        let file = options.open(&path).stage(ErrorKind::Open)?;

        let metadata = file.metadata().stage(ErrorKind::QuerySize)?;
        if !metadata.is_file() {
            return Err(ReadError::new(
                ErrorKind::Open,
                io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }
        let file_size = metadata.len();

        let sector_size = probe_sector_size(&path, &metadata)?;
        let geometry = DeviceGeometry::derive(sector_size, config.chunk_size, config.min_buffer_size);
        if geometry.read_size > u32::MAX as u64 {
            return Err(ReadError::new(
                ErrorKind::InvalidConfig,
                io::Error::new(io::ErrorKind::InvalidInput, "derived read size exceeds 4 GiB"),
            ));
        }

        tracing::info!(
            state = ?SessionState::Opened,
            path = %path.display(),
            file_size,
            sector_size,
            read_size = geometry.read_size,
            buffer_size = geometry.buffer_size,
            "opened"
        );

        Ok(Self {
            file,
            path,
            file_size,
            geometry,
            config,
        })
    }

    /// The derived geometry.
    pub fn geometry(&self) -> &DeviceGeometry {
        &self.geometry
    }

    /// The file size in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// The opened path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stream the file through the default completion backend.
    /// `Opened → Streaming → Draining → Closed`.
    pub fn stream<S: ChunkSink>(self, sink: &mut S) -> Result<StreamSummary> {
        #[cfg(all(target_os = "linux", feature = "io_uring"))]
        {
            use crate::device::UringIo;
            if UringIo::is_available() {
                let mut io = UringIo::with_defaults().stage(ErrorKind::Register)?;
                return self.stream_with(&mut io, sink);
            }
        }
        let mut io = ThreadedIo::new(self.config.io_workers);
        self.stream_with(&mut io, sink)
    }

    /// Stream the file through a caller-supplied completion backend.
    pub fn stream_with<C: CompletionIo, S: ChunkSink>(
        self,
        io: &mut C,
        sink: &mut S,
    ) -> Result<StreamSummary> {
        let num_buffers = self.config.num_buffers;
        let geometry = self.geometry;

        let pool = BufferPool::new(
            num_buffers,
            geometry.buffer_size as usize,
            geometry.buffer_alignment as usize,
        )
        .ok_or_else(|| {
            ReadError::new(
                ErrorKind::Register,
                io::Error::new(io::ErrorKind::OutOfMemory, "buffer arena allocation failed"),
            )
        })?;

        // Safety: the pool (and its arena) outlives every in-flight read;
        // the drain below reaps all outstanding completions before this
        // function returns on any path.
        unsafe {
            io.register(
                &self.file,
                pool.arena().base_ptr(),
                geometry.buffer_size as usize,
                num_buffers,
            )
        }
        .stage(ErrorKind::Register)?;

        tracing::debug!(state = ?SessionState::Streaming, num_buffers, "streaming");

        let mut session = Session {
            file_size: self.file_size,
            read_size: geometry.read_size,
            pending_offsets: vec![0; num_buffers],
            read_offset: 0,
            bytes_read: 0,
            reads_issued: 0,
            in_flight: 0,
        };
        let result = session.run(io, sink, &pool, num_buffers);

        tracing::debug!(state = ?SessionState::Draining, in_flight = session.in_flight, "draining");
        while session.in_flight > 0 {
            // Best effort: a backend that cannot produce further
            // completions has no reads left in flight either.
            match io.wait() {
                Ok(_) => session.in_flight -= 1,
                Err(_) => break,
            }
        }
        let deregistered = io.deregister().stage(ErrorKind::Register);

        tracing::debug!(state = ?SessionState::Closed, bytes_read = session.bytes_read, "closed");

        result?;
        deregistered?;
        Ok(StreamSummary {
            file_size: self.file_size,
            bytes_read: session.bytes_read,
            reads_issued: session.reads_issued,
        })
    }
}

struct Session {
    file_size: u64,
    read_size: u64,
    /// Requested offset per buffer, keyed by buffer index. Completions
    /// carry only the correlation token; the offset lives here.
    pending_offsets: Vec<u64>,
    read_offset: u64,
    bytes_read: u64,
    reads_issued: u64,
    in_flight: usize,
}

impl Session {
    fn run<C: CompletionIo, S: ChunkSink>(
        &mut self,
        io: &mut C,
        sink: &mut S,
        pool: &BufferPool,
        num_buffers: usize,
    ) -> Result<()> {
        // Initial wave: one buffer deliberately stays unissued, bounding
        // in-flight reads to num_buffers - 1.
        for _ in 0..num_buffers - 1 {
            self.issue_read(io, pool)?;
        }

        loop {
            if self.bytes_read == self.file_size {
                return Ok(());
            }
            debug_assert!(self.in_flight > 0, "waiting with nothing in flight");

            let completion = io.wait().stage(ErrorKind::Complete)?;
            self.in_flight -= 1;

            match completion.status {
                CompletionStatus::EndOfFile => {
                    // Over-issued past the end of a short file. Benign.
                    tracing::trace!(token = completion.token, "end-of-file completion ignored");
                }
                CompletionStatus::Error(status) => {
                    return Err(ReadError::from_raw_status(ErrorKind::Complete, status));
                }
                CompletionStatus::Success(n) => {
                    let id = BufferId::from_token(completion.token);
                    let offset = self.pending_offsets[id.index()];
                    let token = pool.reacquire(id);
                    self.bytes_read += n as u64;
                    sink.on_chunk(&token.as_slice()[..n as usize], offset, self.file_size);
                    drop(token);

                    if self.read_offset < self.file_size {
                        self.issue_read(io, pool)?;
                    }
                }
            }
        }
    }

    fn issue_read<C: CompletionIo>(&mut self, io: &mut C, pool: &BufferPool) -> Result<()> {
        let id = pool.pop().release();
        self.pending_offsets[id.index()] = self.read_offset;
        io.submit(ReadRequest {
            token: id.to_token(),
            offset: self.read_offset,
            len: self.read_size as u32,
        })
        .stage(ErrorKind::Submit)?;
        self.in_flight += 1;
        self.reads_issued += 1;
        self.read_offset += self.read_size;
        debug_assert!(self.in_flight < pool.num_buffers());
        Ok(())
    }
}

/// Open `path` and stream it through the default backend in one call.
pub fn read_file<S: ChunkSink>(
    path: impl AsRef<Path>,
    config: ReaderConfig,
    sink: &mut S,
) -> Result<StreamSummary> {
    FileReader::open(path, config)?.stream(sink)
}
