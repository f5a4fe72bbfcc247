//! Portable completion backend
//!
//! A small fixed set of worker threads performing positioned reads, with
//! requests and completions carried over channels. Completions arrive in
//! whatever order the workers finish, which is exactly the reordering a
//! real completion port produces.

use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{unbounded, Receiver, Sender};

use super::traits::{Completion, CompletionIo, CompletionStatus, ReadRequest};

/// Default number of I/O worker threads.
pub const DEFAULT_IO_WORKERS: usize = 2;

enum WorkerRequest {
    Read {
        token: u64,
        dest: RegionPtr,
        len: u32,
        offset: u64,
    },
    Shutdown,
}

/// Raw destination pointer shipped to a worker.
struct RegionPtr(*mut u8);

// Safety: the pointed-to region is exclusively owned by the in-flight read
// (token protocol); nothing else touches it until the completion is
// consumed.
unsafe impl Send for RegionPtr {}

struct Registered {
    req_tx: Sender<WorkerRequest>,
    comp_rx: Receiver<Completion>,
    workers: Vec<thread::JoinHandle<()>>,
    region_size: usize,
    region_count: usize,
    base: usize,
}

/// Completion-based reads on worker threads. The portable counterpart of
/// the io_uring backend.
pub struct ThreadedIo {
    worker_count: usize,
    state: Option<Registered>,
}

impl ThreadedIo {
    /// Create a backend with `worker_count` I/O threads (at least one).
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
            state: None,
        }
    }

    /// Create a backend with the default worker count.
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_IO_WORKERS)
    }

    fn shutdown(state: &mut Registered) {
        for _ in 0..state.workers.len() {
            let _ = state.req_tx.send(WorkerRequest::Shutdown);
        }
        for handle in state.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

/// Fill `buf` from `offset`, looping over short reads.
///
/// Reports the total transferred; zero total with a nonzero request means
/// the read started at or past end of file.
fn read_region(file: &File, buf: &mut [u8], offset: u64) -> CompletionStatus {
    let mut filled = 0usize;
    while filled < buf.len() {
        match file.read_at(&mut buf[filled..], offset + filled as u64) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return CompletionStatus::Error(e.raw_os_error().unwrap_or(libc::EIO));
            }
        }
    }
    if filled == 0 && !buf.is_empty() {
        CompletionStatus::EndOfFile
    } else {
        CompletionStatus::Success(filled as u32)
    }
}

fn worker_loop(file: Arc<File>, region_size: usize, req_rx: Receiver<WorkerRequest>, comp_tx: Sender<Completion>) {
    while let Ok(req) = req_rx.recv() {
        match req {
            WorkerRequest::Read {
                token,
                dest,
                len,
                offset,
            } => {
                debug_assert!(len as usize <= region_size);
                // Safety: exclusive ownership of the region while the read
                // is in flight; the arena outlives the registration.
                let buf = unsafe { std::slice::from_raw_parts_mut(dest.0, len as usize) };
                let status = read_region(&file, buf, offset);
                if comp_tx.send(Completion { token, status }).is_err() {
                    break;
                }
            }
            WorkerRequest::Shutdown => break,
        }
    }
}

impl CompletionIo for ThreadedIo {
    unsafe fn register(
        &mut self,
        file: &File,
        base: *mut u8,
        region_size: usize,
        region_count: usize,
    ) -> io::Result<()> {
        if self.state.is_some() {
            return Err(io::Error::other("already registered"));
        }
        let file = Arc::new(file.try_clone()?);
        let (req_tx, req_rx) = unbounded::<WorkerRequest>();
        let (comp_tx, comp_rx) = unbounded::<Completion>();

        let workers = (0..self.worker_count)
            .map(|i| {
                let file = Arc::clone(&file);
                let req_rx = req_rx.clone();
                let comp_tx = comp_tx.clone();
                thread::Builder::new()
                    .name(format!("oxiread-io-{i}"))
                    .spawn(move || worker_loop(file, region_size, req_rx, comp_tx))
            })
            .collect::<io::Result<Vec<_>>>()?;

        self.state = Some(Registered {
            req_tx,
            comp_rx,
            workers,
            region_size,
            region_count,
            base: base as usize,
        });
        Ok(())
    }

    fn submit(&mut self, request: ReadRequest) -> io::Result<()> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| io::Error::other("not registered"))?;

        let index = request.token as usize;
        if index >= state.region_count || request.len as usize > state.region_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "read does not fit its destination region",
            ));
        }

        let dest = RegionPtr((state.base + index * state.region_size) as *mut u8);
        state
            .req_tx
            .send(WorkerRequest::Read {
                token: request.token,
                dest,
                len: request.len,
                offset: request.offset,
            })
            .map_err(|_| io::Error::other("I/O workers gone"))
    }

    fn wait(&mut self) -> io::Result<Completion> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| io::Error::other("not registered"))?;
        state
            .comp_rx
            .recv()
            .map_err(|_| io::Error::other("I/O workers gone"))
    }

    fn deregister(&mut self) -> io::Result<()> {
        if let Some(mut state) = self.state.take() {
            Self::shutdown(&mut state);
        }
        Ok(())
    }
}

impl Drop for ThreadedIo {
    fn drop(&mut self) {
        let _ = self.deregister();
    }
}
