//! io_uring completion backend (requires `feature = "io_uring"`)
//!
//! Registers the file descriptor and the buffer arena as fixed buffers, so
//! reads are zero-copy into pinned memory. One read per submission queue
//! entry, tagged through `user_data`; retrieval blocks with
//! `submit_and_wait(1)`.

#![cfg(all(target_os = "linux", feature = "io_uring"))]

use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;

use io_uring::{opcode, types, IoUring};

use super::traits::{Completion, CompletionIo, CompletionStatus, ReadRequest};

/// Default submission queue depth.
pub const DEFAULT_SQ_ENTRIES: u32 = 64;

struct Registered {
    region_size: usize,
    region_count: usize,
    base: usize,
}

/// io_uring-backed completion reads with registered (pinned) buffers.
pub struct UringIo {
    ring: IoUring,
    state: Option<Registered>,
}

impl UringIo {
    /// Create a ring with the given submission queue depth.
    pub fn new(sq_entries: u32) -> io::Result<Self> {
        let ring = IoUring::new(sq_entries.max(2))?;
        Ok(Self { ring, state: None })
    }

    /// Create a ring with the default depth.
    pub fn with_defaults() -> io::Result<Self> {
        Self::new(DEFAULT_SQ_ENTRIES)
    }

    /// Check if io_uring is available on this system.
    pub fn is_available() -> bool {
        IoUring::new(2).is_ok()
    }
}

impl CompletionIo for UringIo {
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

        self.ring.submitter().register_files(&[file.as_raw_fd()])?;

        let iovecs: Vec<libc::iovec> = (0..region_count)
            .map(|i| libc::iovec {
                iov_base: base.add(i * region_size) as *mut libc::c_void,
                iov_len: region_size,
            })
            .collect();
        if let Err(e) = self.ring.submitter().register_buffers(&iovecs) {
            let _ = self.ring.submitter().unregister_files();
            return Err(e);
        }

        self.state = Some(Registered {
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

        let dest = (state.base + index * state.region_size) as *mut u8;
        let entry = opcode::ReadFixed::new(types::Fixed(0), dest, request.len, index as u16)
            .offset(request.offset)
            .build()
            .user_data(request.token);

        // Safety: the destination region stays valid and exclusively owned
        // for the lifetime of the operation (registration contract).
        unsafe {
            self.ring
                .submission()
                .push(&entry)
                .map_err(|_| io::Error::other("submission queue full"))?;
        }
        self.ring.submit()?;
        Ok(())
    }

    fn wait(&mut self) -> io::Result<Completion> {
        self.ring.submit_and_wait(1)?;
        let cqe = self
            .ring
            .completion()
            .next()
            .ok_or_else(|| io::Error::other("missing completion entry"))?;

        let status = match cqe.result() {
            n if n > 0 => CompletionStatus::Success(n as u32),
            0 => CompletionStatus::EndOfFile,
            e => CompletionStatus::Error(-e),
        };
        Ok(Completion {
            token: cqe.user_data(),
            status,
        })
    }

    fn deregister(&mut self) -> io::Result<()> {
        if self.state.take().is_some() {
            let _ = self.ring.submitter().unregister_buffers();
            let _ = self.ring.submitter().unregister_files();
        }
        Ok(())
    }
}
