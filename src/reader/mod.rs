//! Read scheduling and chunk delivery

mod scheduler;
mod sink;

pub use scheduler::{read_file, FileReader, SessionState, StreamSummary};
pub use sink::{ChunkSink, FnSink, ProgressSink};
