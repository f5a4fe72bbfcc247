//! Shared test utilities: a deterministic in-memory completion backend and
//! an instrumentation wrapper.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs::File;
use std::io;

use oxiread::device::{Completion, CompletionIo, CompletionStatus, ReadRequest};

/// Order in which queued completions are handed back by `wait`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOrder {
    /// Completion order == submission order.
    Fifo,
    /// Newest submission completes first: the adversarial reordering a
    /// real completion port is allowed to produce.
    Lifo,
}

struct Registration {
    base: usize,
    region_size: usize,
    region_count: usize,
}

/// In-memory completion backend.
///
/// Holds the "file" contents; each submitted read is resolved immediately
/// against them and queued, and `wait` hands completions back in the
/// configured order. Allows deterministic injection of a failing read.
pub struct MemoryIo {
    data: Vec<u8>,
    order: DeliveryOrder,
    registration: Option<Registration>,
    ready: VecDeque<Completion>,
    /// When nonzero, the Nth submitted read (1-based) fails with this
    /// status instead of transferring.
    fail_read_at: u64,
    fail_status: i32,
    submitted: u64,
    /// High-water mark of submitted-but-unwaited reads.
    pub max_in_flight: usize,
}

impl MemoryIo {
    pub fn new(data: Vec<u8>, order: DeliveryOrder) -> Self {
        Self {
            data,
            order,
            registration: None,
            ready: VecDeque::new(),
            fail_read_at: 0,
            fail_status: 0,
            submitted: 0,
            max_in_flight: 0,
        }
    }

    /// Make the Nth submitted read (1-based) complete with `status`.
    pub fn inject_read_error_at(&mut self, read_n: u64, status: i32) {
        self.fail_read_at = read_n;
        self.fail_status = status;
    }

    pub fn reads_submitted(&self) -> u64 {
        self.submitted
    }
}

impl CompletionIo for MemoryIo {
    unsafe fn register(
        &mut self,
        _file: &File,
        base: *mut u8,
        region_size: usize,
        region_count: usize,
    ) -> io::Result<()> {
        self.registration = Some(Registration {
            base: base as usize,
            region_size,
            region_count,
        });
        Ok(())
    }

    fn submit(&mut self, request: ReadRequest) -> io::Result<()> {
        let reg = self
            .registration
            .as_ref()
            .ok_or_else(|| io::Error::other("not registered"))?;
        let index = request.token as usize;
        assert!(index < reg.region_count, "token out of range");
        assert!(request.len as usize <= reg.region_size, "read overruns region");

        self.submitted += 1;

        let status = if self.fail_read_at == self.submitted {
            CompletionStatus::Error(self.fail_status)
        } else if request.offset >= self.data.len() as u64 {
            CompletionStatus::EndOfFile
        } else {
            let offset = request.offset as usize;
            let n = (request.len as usize).min(self.data.len() - offset);
            let dest = (reg.base + index * reg.region_size) as *mut u8;
            unsafe {
                std::ptr::copy_nonoverlapping(self.data.as_ptr().add(offset), dest, n);
            }
            CompletionStatus::Success(n as u32)
        };

        self.ready.push_back(Completion {
            token: request.token,
            status,
        });
        self.max_in_flight = self.max_in_flight.max(self.ready.len());
        Ok(())
    }

    fn wait(&mut self) -> io::Result<Completion> {
        let completion = match self.order {
            DeliveryOrder::Fifo => self.ready.pop_front(),
            DeliveryOrder::Lifo => self.ready.pop_back(),
        };
        completion.ok_or_else(|| io::Error::other("wait with nothing in flight"))
    }

    fn deregister(&mut self) -> io::Result<()> {
        assert!(
            self.ready.is_empty(),
            "deregister with completions still pending"
        );
        self.registration = None;
        Ok(())
    }
}

/// Wrapper counting submissions and completions around any backend.
pub struct CountingIo<C> {
    inner: C,
    in_flight: usize,
    /// High-water mark of in-flight reads.
    pub max_in_flight: usize,
    /// Total reads submitted through this wrapper.
    pub submitted: u64,
}

impl<C> CountingIo<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            in_flight: 0,
            max_in_flight: 0,
            submitted: 0,
        }
    }
}

impl<C: CompletionIo> CompletionIo for CountingIo<C> {
    unsafe fn register(
        &mut self,
        file: &File,
        base: *mut u8,
        region_size: usize,
        region_count: usize,
    ) -> io::Result<()> {
        self.inner.register(file, base, region_size, region_count)
    }

    fn submit(&mut self, request: ReadRequest) -> io::Result<()> {
        self.inner.submit(request)?;
        self.submitted += 1;
        self.in_flight += 1;
        self.max_in_flight = self.max_in_flight.max(self.in_flight);
        Ok(())
    }

    fn wait(&mut self) -> io::Result<Completion> {
        let completion = self.inner.wait()?;
        self.in_flight -= 1;
        Ok(completion)
    }

    fn deregister(&mut self) -> io::Result<()> {
        self.inner.deregister()
    }
}

/// Deterministic pseudo-random payload.
pub fn payload(len: usize) -> Vec<u8> {
    let mut state = 0x2545_f491_4f6c_dd1du64;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state as u8
        })
        .collect()
}
