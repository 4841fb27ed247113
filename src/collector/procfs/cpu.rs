//! CPU usage from the aggregate line of `/proc/stat`.

use std::path::Path;

use tracing::debug;

use crate::collector::error::CollectError;
use crate::collector::procfs::parser::{CPU_FIELD_NAMES, CPU_FIELDS, CpuTicks, parse_cpu_ticks};
use crate::collector::traits::FileSystem;
use crate::rates::counter_delta;

/// Computes usage from tick deltas, `None` when no ticks elapsed.
pub fn cpu_usage(idle: u64, total: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    let idle = idle.min(total);
    Some(100.0 - idle as f64 * 100.0 / total as f64)
}

/// Reads CPU usage, keeping the previous tick counters between calls.
///
/// The baseline starts at zero, so the first reading reflects usage since
/// boot rather than over one interval.
pub struct CpuReader<F: FileSystem> {
    fs: F,
    proc_path: String,
    prev: CpuTicks,
}

impl<F: FileSystem> CpuReader<F> {
    /// Creates a new CPU reader.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            prev: CpuTicks::default(),
        }
    }

    /// Counters observed on the last successful read.
    pub fn previous(&self) -> &CpuTicks {
        &self.prev
    }

    /// Reads `/proc/stat` and returns usage since the previous read.
    ///
    /// A parse failure leaves the stored counters untouched.
    pub fn read(&mut self) -> Result<Option<f64>, CollectError> {
        let path = format!("{}/stat", self.proc_path);
        let content = self
            .fs
            .read_to_string(Path::new(&path))
            .map_err(|e| CollectError::unavailable(&path, e))?;
        let ticks = parse_cpu_ticks(&content)?;
        Ok(self.advance(ticks))
    }

    /// Applies one set of counters: computes usage against the stored
    /// counters, then stores `ticks` whether or not usage was computable.
    pub fn advance(&mut self, ticks: CpuTicks) -> Option<f64> {
        let mut total = 0u64;
        let idle = counter_delta(ticks.idle(), self.prev.idle());

        for idx in 0..CPU_FIELDS {
            let (curr, prev) = (ticks.values[idx], self.prev.values[idx]);
            if curr < prev {
                debug!(
                    field = CPU_FIELD_NAMES[idx],
                    prev, curr, "cpu counter went backwards, treating as reset"
                );
            }
            total = total.saturating_add(counter_delta(curr, prev));
        }

        self.prev = ticks;
        cpu_usage(idle, total)
    }
}
