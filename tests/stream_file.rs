//! End-to-end scheduler behavior: read counts, in-flight bound, exact byte
//! accounting, end-of-file filtering, abort on failure, and out-of-order
//! reconstruction.

mod common;

use std::io::Write;
use std::path::PathBuf;

use common::{payload, CountingIo, DeliveryOrder, MemoryIo};
use oxiread::device::ThreadedIo;
use oxiread::reader::FnSink;
use oxiread::{ErrorKind, FileReader, ReaderConfig};

const READ_SIZE: u64 = 2 * 1024 * 1024; // derived from min_buffer_size below

fn fixture(dir: &tempfile::TempDir, data: &[u8]) -> PathBuf {
    let path = dir.path().join("input.bin");
    std::fs::File::create(&path).unwrap().write_all(data).unwrap();
    path
}

fn config() -> ReaderConfig {
    ReaderConfig {
        chunk_size: 1,
        min_buffer_size: READ_SIZE,
        num_buffers: 4,
        ..ReaderConfig::default()
    }
}

/// Collects chunks and reassembles them by offset.
struct AssemblingSink {
    assembled: Vec<u8>,
    chunks: usize,
}

impl AssemblingSink {
    fn new(total: usize) -> Self {
        Self {
            assembled: vec![0; total],
            chunks: 0,
        }
    }
}

impl oxiread::reader::ChunkSink for AssemblingSink {
    fn on_chunk(&mut self, bytes: &[u8], offset: u64, total_size: u64) {
        assert_eq!(total_size as usize, self.assembled.len());
        let offset = offset as usize;
        self.assembled[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.chunks += 1;
    }
}

#[test]
fn test_ten_million_bytes_five_reads_exact_accounting() {
    // 10,000,000 bytes at 2,097,152 per read with 4 buffers: 5 reads, a
    // short final completion, and no double counting.
    let data = payload(10_000_000);
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, &data);

    let reader = FileReader::open(&path, config()).unwrap();
    assert_eq!(reader.geometry().read_size, 2_097_152);

    let mut io = MemoryIo::new(data.clone(), DeliveryOrder::Fifo);
    let mut sink = AssemblingSink::new(10_000_000);
    let summary = reader.stream_with(&mut io, &mut sink).unwrap();

    assert_eq!(summary.bytes_read, 10_000_000);
    assert_eq!(summary.reads_issued, 5);
    assert_eq!(io.reads_submitted(), 5);
    assert_eq!(sink.chunks, 5);
    // Final read was short: 10,000,000 - 4 * 2,097,152.
    assert_eq!(10_000_000 - 4 * 2_097_152, 1_611_392u64);
    assert_eq!(sink.assembled, data);
}

#[test]
fn test_in_flight_never_exceeds_pool_minus_one() {
    let data = payload(10_000_000);
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, &data);

    let reader = FileReader::open(&path, config()).unwrap();
    let mut io = MemoryIo::new(data, DeliveryOrder::Fifo);
    let mut sink = FnSink::new(|_: &[u8], _: u64, _: u64| {});
    reader.stream_with(&mut io, &mut sink).unwrap();

    // Steady state holds exactly num_buffers - 1 reads in flight.
    assert_eq!(io.max_in_flight, 3);
}

#[test]
fn test_eof_completions_before_data_are_ignored() {
    // File much smaller than the initial wave: reads at R and 2R report
    // end of file. LIFO delivery hands those back *before* the read that
    // carries data; the loop must keep draining.
    let data = payload(1000);
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, &data);

    let reader = FileReader::open(&path, config()).unwrap();
    let mut io = MemoryIo::new(data.clone(), DeliveryOrder::Lifo);
    let mut sink = AssemblingSink::new(1000);
    let summary = reader.stream_with(&mut io, &mut sink).unwrap();

    assert_eq!(summary.bytes_read, 1000);
    // The whole initial wave went out; only one read carried data.
    assert_eq!(summary.reads_issued, 3);
    assert_eq!(sink.chunks, 1);
    assert_eq!(sink.assembled, data);
}

#[test]
fn test_out_of_order_completions_reconstruct_by_offset() {
    let data = payload(9 * 1024 * 1024);
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, &data);

    let reader = FileReader::open(&path, config()).unwrap();
    let mut io = MemoryIo::new(data.clone(), DeliveryOrder::Lifo);
    let mut sink = AssemblingSink::new(9 * 1024 * 1024);
    let summary = reader.stream_with(&mut io, &mut sink).unwrap();

    assert_eq!(summary.bytes_read, 9 * 1024 * 1024);
    assert_eq!(sink.assembled, data);
}

#[test]
fn test_failed_completion_aborts_with_native_status() {
    let data = payload(10_000_000);
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, &data);

    let reader = FileReader::open(&path, config()).unwrap();
    let mut io = MemoryIo::new(data, DeliveryOrder::Fifo);
    io.inject_read_error_at(2, libc::EIO);

    let mut delivered = 0u64;
    let mut sink = FnSink::new(|bytes: &[u8], _: u64, _: u64| delivered += bytes.len() as u64);
    let err = reader.stream_with(&mut io, &mut sink).unwrap_err();
    drop(sink);

    assert_eq!(err.kind(), ErrorKind::Complete);
    assert_eq!(err.raw_os_status(), Some(libc::EIO));
    // The chunk delivered before the failure is not rolled back.
    assert_eq!(delivered, READ_SIZE);
}

#[test]
fn test_threaded_backend_end_to_end() {
    // Real worker threads, genuinely nondeterministic completion order.
    let total = 6 * 1024 * 1024 + 12_345;
    let data = payload(total);
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, &data);

    let reader = FileReader::open(&path, config()).unwrap();
    let mut io = CountingIo::new(ThreadedIo::new(3));
    let mut sink = AssemblingSink::new(total);
    let summary = reader.stream_with(&mut io, &mut sink).unwrap();

    assert_eq!(summary.bytes_read, total as u64);
    assert_eq!(summary.reads_issued, (total as u64).div_ceil(READ_SIZE));
    assert!(io.max_in_flight <= 3, "in-flight bound violated");
    assert_eq!(sink.assembled, data);
}

#[test]
fn test_default_backend_end_to_end() {
    let total = 3 * 1024 * 1024;
    let data = payload(total);
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, &data);

    let reader = FileReader::open(&path, config()).unwrap();
    let mut sink = AssemblingSink::new(total);
    let summary = reader.stream(&mut sink).unwrap();

    assert_eq!(summary.bytes_read, total as u64);
    assert_eq!(sink.assembled, data);
}

#[test]
fn test_progress_sink_reaches_completion() {
    let total = 5 * 1024 * 1024;
    let data = payload(total);
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir, &data);

    let mut sink = oxiread::reader::ProgressSink::new();
    let summary = oxiread::read_file(&path, config(), &mut sink).unwrap();
    assert_eq!(summary.bytes_read, total as u64);
    assert_eq!(sink.bytes_seen(), total as u64);
}
