//! Network I/O volumes from `/proc/net/dev`.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::collector::error::CollectError;
use crate::collector::procfs::parser::parse_net_dev;
use crate::collector::traits::FileSystem;
use crate::model::{IoUnit, NetDirection, NetIo};
use crate::rates::{DeltaTracker, IoMode};

/// Reads per-interface sent/received volumes.
///
/// Same cumulative/rate semantics as [`DiskReader`](super::disk::DiskReader),
/// differenced on raw byte counts.
pub struct NetworkReader<F: FileSystem> {
    fs: F,
    proc_path: String,
    unit: IoUnit,
    mode: IoMode,
    prev: DeltaTracker<(String, NetDirection)>,
}

impl<F: FileSystem> NetworkReader<F> {
    pub fn new(fs: F, proc_path: impl Into<String>, unit: IoUnit, mode: IoMode) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            unit,
            mode,
            prev: DeltaTracker::new(),
        }
    }

    /// Reads `/proc/net/dev`.
    pub fn read(&mut self) -> Result<BTreeMap<String, NetIo>, CollectError> {
        let path = format!("{}/net/dev", self.proc_path);
        let content = self
            .fs
            .read_to_string(Path::new(&path))
            .map_err(|e| CollectError::unavailable(&path, e))?;

        let parsed = parse_net_dev(&content);
        for issue in &parsed.issues {
            warn!(reader = "network", line = issue.line, "could not parse network stats: {}", issue.message);
        }

        let mut interfaces = BTreeMap::new();
        for row in parsed.rows {
            let (received, sent) = match self.mode {
                IoMode::Cumulative => (row.rx_bytes, row.tx_bytes),
                IoMode::Rate => (
                    self.delta(&row.interface, NetDirection::Received, row.rx_bytes),
                    self.delta(&row.interface, NetDirection::Sent, row.tx_bytes),
                ),
            };
            interfaces.insert(
                row.interface,
                NetIo {
                    sent: self.unit.scale(sent),
                    received: self.unit.scale(received),
                },
            );
        }

        if self.mode == IoMode::Rate {
            self.prev.retain(|(name, _)| interfaces.contains_key(name));
        }

        Ok(interfaces)
    }

    fn delta(&mut self, interface: &str, dir: NetDirection, bytes: u64) -> u64 {
        let (delta, reset) = self.prev.update((interface.to_string(), dir), bytes);
        if reset {
            debug!(reader = "network", interface, ?dir, "byte counter went backwards, treating as reset");
        }
        delta
    }
}
