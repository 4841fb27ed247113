//! Metrics sink capability and an in-memory registry implementing it.
//!
//! The sampler only depends on [`MetricsSink`]. How values are stored or
//! exposed to a pull-based metrics system is up to the implementation.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

use crate::model::{DiskOp, NetDirection, Snapshot};

/// Destination for computed metrics.
///
/// Methods take `&self`; implementations that keep state synchronise
/// internally so a sink can be shared with readers of the metrics.
pub trait MetricsSink: Send + Sync {
    /// Records CPU usage in percent.
    fn record_cpu_usage(&self, percent: f64);
    /// Records memory usage in percent.
    fn record_memory_usage(&self, percent: f64);
    /// Records a disk volume for `device`.
    fn record_disk_io(&self, device: &str, op: DiskOp, value: f64);
    /// Records a network volume for `interface`.
    fn record_network_io(&self, interface: &str, direction: NetDirection, value: f64);
}

impl<S: MetricsSink + ?Sized> MetricsSink for std::sync::Arc<S> {
    fn record_cpu_usage(&self, percent: f64) {
        (**self).record_cpu_usage(percent)
    }

    fn record_memory_usage(&self, percent: f64) {
        (**self).record_memory_usage(percent)
    }

    fn record_disk_io(&self, device: &str, op: DiskOp, value: f64) {
        (**self).record_disk_io(device, op, value)
    }

    fn record_network_io(&self, interface: &str, direction: NetDirection, value: f64) {
        (**self).record_network_io(interface, direction, value)
    }
}

/// Forwards every value in `snapshot` to `sink`.
///
/// Unset CPU or memory readings are skipped rather than recorded as zero.
pub fn publish(snapshot: &Snapshot, sink: &dyn MetricsSink) {
    if let Some(cpu) = snapshot.cpu_usage {
        sink.record_cpu_usage(cpu);
    }
    if let Some(mem) = snapshot.memory_usage {
        sink.record_memory_usage(mem);
    }
    for (device, io) in &snapshot.disks {
        sink.record_disk_io(device, DiskOp::Read, io.read as f64);
        sink.record_disk_io(device, DiskOp::Write, io.write as f64);
    }
    for (interface, io) in &snapshot.networks {
        sink.record_network_io(interface, NetDirection::Received, io.received as f64);
        sink.record_network_io(interface, NetDirection::Sent, io.sent as f64);
    }
}

/// One labelled series value in a [`MetricsExport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesValue {
    pub name: String,
    pub io: &'static str,
    pub value: f64,
}

/// Point-in-time copy of everything a [`MetricsRegistry`] holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsExport {
    pub cpu_usage: Option<f64>,
    pub memory_usage: Option<f64>,
    pub disk_io: Vec<SeriesValue>,
    pub network_io: Vec<SeriesValue>,
    /// Number of values recorded since creation.
    pub updates: u64,
}

#[derive(Debug, Default)]
struct RegistryState {
    cpu_usage: Option<f64>,
    memory_usage: Option<f64>,
    disk_io: BTreeMap<(String, DiskOp), f64>,
    network_io: BTreeMap<(String, NetDirection), f64>,
    updates: u64,
}

/// In-memory sink keeping the latest value of every series.
///
/// CPU and memory are gauges. Disk and network series hold whatever the
/// sampler produced last: the cumulative total in cumulative mode, the
/// interval volume in rate mode.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    state: Mutex<RegistryState>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn cpu_usage(&self) -> Option<f64> {
        self.state().cpu_usage
    }

    pub fn memory_usage(&self) -> Option<f64> {
        self.state().memory_usage
    }

    pub fn disk_io(&self, device: &str, op: DiskOp) -> Option<f64> {
        self.state().disk_io.get(&(device.to_string(), op)).copied()
    }

    pub fn network_io(&self, interface: &str, direction: NetDirection) -> Option<f64> {
        self.state()
            .network_io
            .get(&(interface.to_string(), direction))
            .copied()
    }

    /// Copies the current values out, series sorted by name then direction.
    pub fn export(&self) -> MetricsExport {
        let state = self.state();
        MetricsExport {
            cpu_usage: state.cpu_usage,
            memory_usage: state.memory_usage,
            disk_io: state
                .disk_io
                .iter()
                .map(|((name, op), value)| SeriesValue {
                    name: name.clone(),
                    io: op.as_str(),
                    value: *value,
                })
                .collect(),
            network_io: state
                .network_io
                .iter()
                .map(|((name, dir), value)| SeriesValue {
                    name: name.clone(),
                    io: dir.as_str(),
                    value: *value,
                })
                .collect(),
            updates: state.updates,
        }
    }
}

impl MetricsSink for MetricsRegistry {
    fn record_cpu_usage(&self, percent: f64) {
        let mut state = self.state();
        state.cpu_usage = Some(percent);
        state.updates += 1;
    }

    fn record_memory_usage(&self, percent: f64) {
        let mut state = self.state();
        state.memory_usage = Some(percent);
        state.updates += 1;
    }

    fn record_disk_io(&self, device: &str, op: DiskOp, value: f64) {
        let mut state = self.state();
        state.disk_io.insert((device.to_string(), op), value);
        state.updates += 1;
    }

    fn record_network_io(&self, interface: &str, direction: NetDirection, value: f64) {
        let mut state = self.state();
        state
            .network_io
            .insert((interface.to_string(), direction), value);
        state.updates += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DiskIo, NetIo};
    use std::sync::Arc;

    fn snapshot() -> Snapshot {
        let mut s = Snapshot {
            timestamp: 0,
            cpu_usage: Some(42.0),
            memory_usage: None,
            ..Default::default()
        };
        s.disks.insert("sda".to_string(), DiskIo { read: 7, write: 9 });
        s.networks
            .insert("eth0".to_string(), NetIo { sent: 3, received: 5 });
        s
    }

    #[test]
    fn publish_forwards_all_values() {
        let registry = MetricsRegistry::new();
        publish(&snapshot(), &registry);

        assert_eq!(registry.cpu_usage(), Some(42.0));
        assert_eq!(registry.memory_usage(), None);
        assert_eq!(registry.disk_io("sda", DiskOp::Read), Some(7.0));
        assert_eq!(registry.disk_io("sda", DiskOp::Write), Some(9.0));
        assert_eq!(registry.network_io("eth0", NetDirection::Sent), Some(3.0));
        assert_eq!(
            registry.network_io("eth0", NetDirection::Received),
            Some(5.0)
        );
        // cpu + 2 disk + 2 network
        assert_eq!(registry.export().updates, 5);
    }

    #[test]
    fn later_values_replace_earlier_ones() {
        let registry = MetricsRegistry::new();
        registry.record_cpu_usage(10.0);
        registry.record_cpu_usage(20.0);
        registry.record_disk_io("sda", DiskOp::Read, 1.0);
        registry.record_disk_io("sda", DiskOp::Read, 4.0);

        assert_eq!(registry.cpu_usage(), Some(20.0));
        assert_eq!(registry.disk_io("sda", DiskOp::Read), Some(4.0));
    }

    #[test]
    fn export_uses_direction_tags() {
        let registry = MetricsRegistry::new();
        publish(&snapshot(), &registry);

        let export = registry.export();
        let tags: Vec<&str> = export.disk_io.iter().map(|s| s.io).collect();
        assert_eq!(tags, vec!["read", "write"]);
        let tags: Vec<&str> = export.network_io.iter().map(|s| s.io).collect();
        assert_eq!(tags, vec!["sent", "received"]);

        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["disk_io"][0]["name"], "sda");
    }

    #[test]
    fn shared_registry_through_arc() {
        let registry = Arc::new(MetricsRegistry::new());
        let sink: Arc<MetricsRegistry> = Arc::clone(&registry);
        let handle = std::thread::spawn(move || sink.record_memory_usage(55.0));
        handle.join().unwrap();
        assert_eq!(registry.memory_usage(), Some(55.0));
    }
}
