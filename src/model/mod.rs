//! Data model shared by the sampler, the alert evaluator and metric sinks.

pub mod snapshot;

pub use snapshot::{DiskIo, DiskOp, IoUnit, NetDirection, NetIo, SECTOR_SIZE, Snapshot};
