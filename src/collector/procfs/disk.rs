//! Disk I/O volumes from `/proc/diskstats`.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::collector::error::CollectError;
use crate::collector::procfs::parser::parse_diskstats;
use crate::collector::traits::FileSystem;
use crate::model::{DiskIo, DiskOp, IoUnit, SECTOR_SIZE};
use crate::rates::{DeltaTracker, IoMode};

/// Reads per-device read/write volumes.
///
/// In [`IoMode::Cumulative`] the values are totals since boot. In
/// [`IoMode::Rate`] they are the volume moved since the previous read,
/// differenced on raw sector counts before unit scaling.
pub struct DiskReader<F: FileSystem> {
    fs: F,
    proc_path: String,
    unit: IoUnit,
    mode: IoMode,
    prev: DeltaTracker<(String, DiskOp)>,
}

impl<F: FileSystem> DiskReader<F> {
    pub fn new(fs: F, proc_path: impl Into<String>, unit: IoUnit, mode: IoMode) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            unit,
            mode,
            prev: DeltaTracker::new(),
        }
    }

    /// Reads `/proc/diskstats`.
    ///
    /// Bad lines are logged and reported as zero; only an unreadable source
    /// fails the read.
    pub fn read(&mut self) -> Result<BTreeMap<String, DiskIo>, CollectError> {
        let path = format!("{}/diskstats", self.proc_path);
        let content = self
            .fs
            .read_to_string(Path::new(&path))
            .map_err(|e| CollectError::unavailable(&path, e))?;

        let parsed = parse_diskstats(&content);
        for issue in &parsed.issues {
            warn!(reader = "disk", line = issue.line, "could not parse disk stats: {}", issue.message);
        }

        let mut disks = BTreeMap::new();
        for row in parsed.rows {
            let (read, write) = match self.mode {
                IoMode::Cumulative => (row.read_sectors, row.write_sectors),
                IoMode::Rate => (
                    self.delta(&row.device, DiskOp::Read, row.read_sectors),
                    self.delta(&row.device, DiskOp::Write, row.write_sectors),
                ),
            };
            disks.insert(
                row.device,
                DiskIo {
                    read: self.unit.scale(read.saturating_mul(SECTOR_SIZE)),
                    write: self.unit.scale(write.saturating_mul(SECTOR_SIZE)),
                },
            );
        }

        if self.mode == IoMode::Rate {
            self.prev.retain(|(device, _)| disks.contains_key(device));
        }

        Ok(disks)
    }

    fn delta(&mut self, device: &str, op: DiskOp, sectors: u64) -> u64 {
        let (delta, reset) = self.prev.update((device.to_string(), op), sectors);
        if reset {
            debug!(reader = "disk", device, ?op, "sector counter went backwards, treating as reset");
        }
        delta
    }
}
