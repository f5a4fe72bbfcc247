//! Device geometry derivation and sector-size probe
//!
//! Unbuffered device access requires both transfer length and buffer
//! address to be multiples of the device's minimal transfer unit. The
//! derivation keeps reads sector-aligned while respecting the caller's
//! logical record granularity; records spanning a read boundary are still
//! the consumer's problem.

use std::fs::Metadata;
use std::io;
use std::path::Path;

use crate::error::{ErrorKind, IoResultExt, ReadError, Result};
use crate::utility::{lcm, next_power_of_two, round_up_to_multiple};

/// Sector size assumed for files that do not live on a block-addressable
/// device (outside the input contract, e.g. tmpfs in tests).
pub const FALLBACK_SECTOR_SIZE: u64 = 512;

/// Alignment and sizing constraints for one file/volume pair.
///
/// Computed once per session at open time; immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceGeometry {
    /// Physical sector size of the containing device.
    pub sector_size: u64,
    /// Smallest transfer length that is a multiple of both the sector size
    /// and the caller's chunk size: `lcm(chunk_size, sector_size)`.
    pub min_read_granularity: u64,
    /// Required buffer address alignment:
    /// `lcm(sector_size, next_power_of_two(sector_size))`.
    pub buffer_alignment: u64,
    /// Length of every read: `min_buffer_size` rounded up to the read
    /// granularity.
    pub read_size: u64,
    /// Size of every pool buffer: `read_size` rounded up to the buffer
    /// alignment.
    pub buffer_size: u64,
}

impl DeviceGeometry {
    /// Derive the geometry from a sector size and the caller's chunk and
    /// minimum-buffer sizes. Pure arithmetic; all inputs must be nonzero.
    pub fn derive(sector_size: u64, chunk_size: u64, min_buffer_size: u64) -> Self {
        let min_read_granularity = lcm(chunk_size, sector_size);
        let buffer_alignment = lcm(sector_size, next_power_of_two(sector_size));
        let read_size = round_up_to_multiple(min_buffer_size, min_read_granularity);
        let buffer_size = round_up_to_multiple(read_size, buffer_alignment);
        Self {
            sector_size,
            min_read_granularity,
            buffer_alignment,
            read_size,
            buffer_size,
        }
    }
}

/// Query the physical sector size of the device containing `path`.
///
/// Resolves the file to its containing block device and reads the sector
/// size from the device's queue attributes. Files outside the block layer
/// fall back to [`FALLBACK_SECTOR_SIZE`] with a warning; genuine I/O errors
/// during the query are fatal.
pub fn probe_sector_size(path: &Path, metadata: &Metadata) -> Result<u64> {
    imp::sector_size(path, metadata)
}

#[cfg(target_os = "linux")]
mod imp {
    use super::*;
    use std::os::unix::fs::MetadataExt;

    pub(super) fn sector_size(path: &Path, metadata: &Metadata) -> Result<u64> {
        let dev = metadata.dev() as libc::dev_t;
        let (major, minor) = (libc::major(dev), libc::minor(dev));

        // Whole devices expose queue/ directly; for partitions it lives
        // under the parent device.
        let base = format!("/sys/dev/block/{major}:{minor}");
        for attr in [
            format!("{base}/queue/logical_block_size"),
            format!("{base}/../queue/logical_block_size"),
        ] {
            match std::fs::read_to_string(&attr) {
                Ok(raw) => {
                    let sector: u64 = raw.trim().parse().map_err(|_| {
                        ReadError::new(
                            ErrorKind::QueryGeometry,
                            io::Error::new(
                                io::ErrorKind::InvalidData,
                                format!("unparsable sector size {raw:?} in {attr}"),
                            ),
                        )
                    })?;
                    if sector == 0 {
                        return Err(ReadError::new(
                            ErrorKind::QueryGeometry,
                            io::Error::new(io::ErrorKind::InvalidData, "zero sector size"),
                        ));
                    }
                    return Ok(sector);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e).stage(ErrorKind::QueryGeometry),
            }
        }

        tracing::warn!(
            path = %path.display(),
            device = format!("{major}:{minor}"),
            "no block device queue attributes; assuming {FALLBACK_SECTOR_SIZE}-byte sectors"
        );
        Ok(FALLBACK_SECTOR_SIZE)
    }
}

#[cfg(not(target_os = "linux"))]
mod imp {
    use super::*;

    pub(super) fn sector_size(path: &Path, _metadata: &Metadata) -> Result<u64> {
        tracing::warn!(
            path = %path.display(),
            "sector probe unsupported on this platform; assuming {FALLBACK_SECTOR_SIZE}-byte sectors"
        );
        Ok(FALLBACK_SECTOR_SIZE)
    }
}
