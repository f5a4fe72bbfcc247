//! Device geometry and completion-based I/O backends

mod geometry;
mod threaded;
mod traits;
#[cfg(all(target_os = "linux", feature = "io_uring"))]
mod uring;

pub use geometry::{probe_sector_size, DeviceGeometry, FALLBACK_SECTOR_SIZE};
pub use threaded::ThreadedIo;
pub use traits::{Completion, CompletionIo, CompletionStatus, ReadRequest};
#[cfg(all(target_os = "linux", feature = "io_uring"))]
pub use uring::UringIo;
