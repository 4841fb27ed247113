//! Sampler that runs every reader once per tick.
//!
//! The `Sampler` struct owns the four readers and their differencing state,
//! combines their output into a `Snapshot`, and forwards it to the metrics
//! sink and the alert evaluator.

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{error, warn};

use crate::alert::{AlertEvaluator, AlertEvent, AlertSink};
use crate::collector::error::CollectError;
use crate::collector::memory::MemoryReader;
use crate::collector::procfs::{CpuReader, DiskReader, NetworkReader};
use crate::collector::traits::{CommandRunner, FileSystem};
use crate::model::{IoUnit, Snapshot};
use crate::rates::IoMode;
use crate::sink::{MetricsSink, publish};

/// The four independent readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reader {
    Cpu,
    Memory,
    Disk,
    Network,
}

impl Reader {
    pub fn as_str(self) -> &'static str {
        match self {
            Reader::Cpu => "cpu",
            Reader::Memory => "memory",
            Reader::Disk => "disk",
            Reader::Network => "network",
        }
    }
}

/// Timing information for each reader.
///
/// Used for debugging and performance monitoring.
#[derive(Debug, Clone, Default)]
pub struct SamplerTiming {
    /// Total tick time.
    pub total: Duration,
    pub cpu: Duration,
    pub memory: Duration,
    pub disk: Duration,
    pub network: Duration,
}

/// Where the readers find their sources and how they report volumes.
#[derive(Debug, Clone)]
pub struct SamplerOptions {
    /// Base path to proc filesystem (usually "/proc").
    pub proc_path: String,
    pub memory_command: String,
    pub memory_args: Vec<String>,
    pub command_timeout: Duration,
    pub io_unit: IoUnit,
    pub io_mode: IoMode,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            proc_path: "/proc".to_string(),
            memory_command: "free".to_string(),
            memory_args: vec!["--line".to_string(), "--mega".to_string()],
            command_timeout: Duration::from_secs(2),
            io_unit: IoUnit::Megabytes,
            io_mode: IoMode::Cumulative,
        }
    }
}

/// Runs the CPU, memory, disk and network readers.
///
/// Readers run sequentially on the caller's thread. The sampler is the sole
/// owner of all differencing state, so it needs no locking as long as one
/// thread drives it.
pub struct Sampler<F: FileSystem + Clone, C: CommandRunner> {
    cpu: CpuReader<F>,
    memory: MemoryReader<C>,
    disk: DiskReader<F>,
    network: NetworkReader<F>,
    /// Timing information from the last collect call.
    last_timing: Option<SamplerTiming>,
    /// Readers that failed during the last collect call.
    last_failures: Vec<Reader>,
}

impl<F: FileSystem + Clone, C: CommandRunner> Sampler<F, C> {
    /// Creates a new sampler.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `runner` - Command runner for the memory command (real or mock)
    /// * `options` - Source locations and volume reporting
    pub fn new(fs: F, runner: C, options: &SamplerOptions) -> Self {
        Self {
            cpu: CpuReader::new(fs.clone(), &options.proc_path),
            memory: MemoryReader::new(
                runner,
                &options.memory_command,
                options.memory_args.clone(),
                options.command_timeout,
            ),
            disk: DiskReader::new(
                fs.clone(),
                &options.proc_path,
                options.io_unit,
                options.io_mode,
            ),
            network: NetworkReader::new(fs, &options.proc_path, options.io_unit, options.io_mode),
            last_timing: None,
            last_failures: Vec::new(),
        }
    }

    /// Returns timing information from the last collect call.
    pub fn last_timing(&self) -> Option<&SamplerTiming> {
        self.last_timing.as_ref()
    }

    /// Returns the readers that failed during the last collect call.
    pub fn last_failures(&self) -> &[Reader] {
        &self.last_failures
    }

    /// Runs every reader once and combines the results.
    ///
    /// A failing reader is logged and leaves its part of the snapshot empty;
    /// it never prevents the others from running.
    pub fn collect(&mut self) -> Snapshot {
        let total_start = Instant::now();
        let mut timing = SamplerTiming::default();
        self.last_failures.clear();

        let mut snapshot = Snapshot {
            timestamp: Utc::now().timestamp(),
            ..Default::default()
        };

        let start = Instant::now();
        let cpu = self.cpu.read();
        timing.cpu = start.elapsed();
        snapshot.cpu_usage = self.check(Reader::Cpu, cpu).flatten();

        let start = Instant::now();
        let memory = self.memory.read();
        timing.memory = start.elapsed();
        snapshot.memory_usage = self.check(Reader::Memory, memory);

        let start = Instant::now();
        let disks = self.disk.read();
        timing.disk = start.elapsed();
        snapshot.disks = self.check(Reader::Disk, disks).unwrap_or_default();

        let start = Instant::now();
        let networks = self.network.read();
        timing.network = start.elapsed();
        snapshot.networks = self.check(Reader::Network, networks).unwrap_or_default();

        timing.total = total_start.elapsed();
        self.last_timing = Some(timing);

        snapshot
    }

    /// Collects one snapshot, publishes it and evaluates the CPU alert.
    ///
    /// The CPU reading only enters the alert window when usage could be
    /// computed this tick. Ticks without one are skipped, so a window can
    /// cover more wall-clock time than readings x interval, while the
    /// reported span still counts only the readings it holds.
    pub fn tick(
        &mut self,
        metrics: &dyn MetricsSink,
        evaluator: &mut AlertEvaluator,
        alerts: &mut dyn AlertSink,
    ) -> (Snapshot, Option<AlertEvent>) {
        let snapshot = self.collect();
        publish(&snapshot, metrics);

        let event = snapshot.cpu_usage.and_then(|cpu| evaluator.observe(cpu));
        if let Some(ref event) = event {
            warn!(
                average = event.average,
                readings = event.readings,
                "{}", event
            );
            if let Err(e) = alerts.emit(event) {
                error!(error = %e, "error writing alert");
            }
        }

        (snapshot, event)
    }

    fn check<T>(&mut self, reader: Reader, result: Result<T, CollectError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(reader = reader.as_str(), error = %e, "reader failed, skipping this tick");
                self.last_failures.push(reader);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertSinkError;
    use crate::collector::mock::MockFs;
    use crate::model::{DiskIo, DiskOp, NetDirection, NetIo};
    use crate::sink::MetricsRegistry;

    #[derive(Default)]
    struct RecordingSink {
        events: Vec<String>,
    }

    impl AlertSink for RecordingSink {
        fn emit(&mut self, event: &AlertEvent) -> Result<(), AlertSinkError> {
            self.events.push(event.to_string());
            Ok(())
        }
    }

    fn sampler(fs: MockFs) -> Sampler<MockFs, MockFs> {
        let options = SamplerOptions {
            io_unit: IoUnit::Bytes,
            ..Default::default()
        };
        Sampler::new(fs.clone(), fs, &options)
    }

    #[test]
    fn collect_typical_host() {
        let mut s = sampler(MockFs::typical_host());
        let snapshot = s.collect();

        // 80000 idle of 94800 total since boot
        let cpu = snapshot.cpu_usage.unwrap();
        assert!((cpu - (100.0 - 80000.0 * 100.0 / 94800.0)).abs() < 1e-9);
        // MemUse 4000 of MemFree 5000 + CachUse 1000 + MemUse 4000
        assert!((snapshot.memory_usage.unwrap() - 40.0).abs() < 1e-9);
        assert_eq!(snapshot.disks.len(), 4);
        assert_eq!(
            snapshot.disks["sda"],
            DiskIo {
                read: 987654 * 512,
                write: 456789 * 512
            }
        );
        assert_eq!(
            snapshot.networks["eth0"],
            NetIo {
                sent: 262144000,
                received: 524288000
            }
        );
        assert!(s.last_failures().is_empty());
        assert!(s.last_timing().is_some());
    }

    #[test]
    fn memory_failure_does_not_block_other_readers() {
        let mut fs = MockFs::typical_host();
        fs.remove_command("free");
        let mut s = sampler(fs);

        let snapshot = s.collect();
        assert!(snapshot.memory_usage.is_none());
        assert!(snapshot.cpu_usage.is_some());
        assert!(!snapshot.disks.is_empty());
        assert!(!snapshot.networks.is_empty());
        assert_eq!(s.last_failures(), &[Reader::Memory]);
    }

    #[test]
    fn every_source_failing_still_produces_a_snapshot() {
        let mut s = sampler(MockFs::new());
        let snapshot = s.collect();

        assert_eq!(snapshot.cpu_usage, None);
        assert_eq!(snapshot.memory_usage, None);
        assert!(snapshot.disks.is_empty());
        assert!(snapshot.networks.is_empty());
        assert_eq!(
            s.last_failures(),
            &[Reader::Cpu, Reader::Memory, Reader::Disk, Reader::Network]
        );
    }

    #[test]
    fn failures_are_cleared_on_next_tick() {
        let mut fs = MockFs::typical_host();
        fs.remove_file("/proc/stat");
        let mut s = sampler(fs.clone());
        s.collect();
        assert_eq!(s.last_failures(), &[Reader::Cpu]);

        fs.set_cpu_ticks([1, 0, 0, 1, 0, 0, 0, 0, 0, 0]);
        s.collect();
        assert!(s.last_failures().is_empty());
    }

    #[test]
    fn independent_samplers_keep_separate_state() {
        let mut a = sampler(MockFs::typical_host());
        let mut b = sampler(MockFs::typical_host());
        a.collect();
        // A second tick with unchanged counters has no elapsed ticks.
        assert_eq!(a.collect().cpu_usage, None);
        // `b` has never sampled, so it still diffs against zero.
        assert!(b.collect().cpu_usage.is_some());
    }

    #[test]
    fn tick_without_cpu_reading_does_not_fill_window() {
        let mut fs = MockFs::typical_host();
        let registry = MetricsRegistry::new();
        let mut evaluator = AlertEvaluator::new(50.0, 2, Duration::from_secs(5));
        let mut alerts = RecordingSink::default();

        fs.set_cpu_ticks([0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let mut s = sampler(fs.clone());
        s.tick(&registry, &mut evaluator, &mut alerts);

        fs.set_cpu_ticks([90, 0, 0, 10, 0, 0, 0, 0, 0, 0]);
        s.tick(&registry, &mut evaluator, &mut alerts);
        assert_eq!(evaluator.window().count, 1);

        // Unreadable, then unchanged counters: no reading either time.
        fs.remove_file("/proc/stat");
        s.tick(&registry, &mut evaluator, &mut alerts);
        fs.set_cpu_ticks([90, 0, 0, 10, 0, 0, 0, 0, 0, 0]);
        let (_, event) = s.tick(&registry, &mut evaluator, &mut alerts);
        assert!(event.is_none());
        assert_eq!(evaluator.window().count, 1);

        fs.set_cpu_ticks([180, 0, 0, 20, 0, 0, 0, 0, 0, 0]);
        let (_, event) = s.tick(&registry, &mut evaluator, &mut alerts);
        let event = event.unwrap();
        assert_eq!(event.readings, 2);
        assert_eq!(event.elapsed_secs, 10);
        assert_eq!(alerts.events.len(), 1);
    }

    #[test]
    fn tick_publishes_and_alerts() {
        let mut fs = MockFs::typical_host();
        let registry = MetricsRegistry::new();
        let mut evaluator = AlertEvaluator::new(80.0, 2, Duration::from_secs(5));
        let mut alerts = RecordingSink::default();

        // Baseline, then two intervals at 90% busy.
        fs.set_cpu_ticks([0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let mut s = sampler(fs.clone());
        let (first, _) = s.tick(&registry, &mut evaluator, &mut alerts);
        assert_eq!(first.cpu_usage, None);

        let mut events = Vec::new();
        for step in 1..=2u64 {
            fs.set_cpu_ticks([90 * step, 0, 0, 10 * step, 0, 0, 0, 0, 0, 0]);
            let (snapshot, event) = s.tick(&registry, &mut evaluator, &mut alerts);
            assert!((snapshot.cpu_usage.unwrap() - 90.0).abs() < 1e-9);
            events.extend(event);
        }

        assert_eq!(events.len(), 1);
        assert_eq!(
            alerts.events,
            vec!["CPU Usage remained above 80 for last 10 seconds".to_string()]
        );
        assert_eq!(registry.cpu_usage(), Some(90.0));
        assert_eq!(registry.memory_usage(), Some(40.0));
        assert_eq!(
            registry.disk_io("sda", DiskOp::Read),
            Some((987654 * 512) as f64)
        );
        assert_eq!(
            registry.network_io("lo", NetDirection::Sent),
            Some(104857600.0)
        );
    }
}
