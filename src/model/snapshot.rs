//! Snapshot structures produced by one sampling tick.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Size of a kernel block-layer sector in bytes.
pub const SECTOR_SIZE: u64 = 512;

/// Unit disk and network volumes are reported in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoUnit {
    Bytes,
    Kilobytes,
    #[default]
    Megabytes,
}

impl IoUnit {
    pub fn divisor(self) -> u64 {
        match self {
            IoUnit::Bytes => 1,
            IoUnit::Kilobytes => 1024,
            IoUnit::Megabytes => 1024 * 1024,
        }
    }

    /// Converts a byte count, truncating any partial unit.
    pub fn scale(self, bytes: u64) -> u64 {
        bytes / self.divisor()
    }
}

/// Direction tag for disk volumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiskOp {
    Read,
    Write,
}

impl DiskOp {
    pub fn as_str(self) -> &'static str {
        match self {
            DiskOp::Read => "read",
            DiskOp::Write => "write",
        }
    }
}

/// Direction tag for network volumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetDirection {
    Sent,
    Received,
}

impl NetDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            NetDirection::Sent => "sent",
            NetDirection::Received => "received",
        }
    }
}

/// Read/write volume of one block device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskIo {
    pub read: u64,
    pub write: u64,
}

/// Sent/received volume of one network interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetIo {
    pub sent: u64,
    pub received: u64,
}

/// Everything one `Sampler::collect` produced.
///
/// A reader that failed leaves its field empty (`None` or an empty map); the
/// other fields are unaffected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unix timestamp (seconds) when the tick started.
    pub timestamp: i64,
    /// CPU usage in percent, unset when no ticks elapsed or the reader failed.
    pub cpu_usage: Option<f64>,
    /// Memory usage in percent.
    pub memory_usage: Option<f64>,
    /// Per-device volumes, keyed by device name.
    pub disks: BTreeMap<String, DiskIo>,
    /// Per-interface volumes, keyed by interface name.
    pub networks: BTreeMap<String, NetIo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_unit_scaling_truncates() {
        assert_eq!(IoUnit::Bytes.scale(1000 * SECTOR_SIZE), 512_000);
        assert_eq!(IoUnit::Kilobytes.scale(1536), 1);
        assert_eq!(IoUnit::Megabytes.scale(1024 * 1024 - 1), 0);
        assert_eq!(IoUnit::Megabytes.scale(5 * 1024 * 1024), 5);
    }

    #[test]
    fn snapshot_serializes() {
        let mut snapshot = Snapshot {
            timestamp: 1_700_000_000,
            cpu_usage: Some(12.5),
            ..Default::default()
        };
        snapshot
            .disks
            .insert("sda".to_string(), DiskIo { read: 1, write: 2 });

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
