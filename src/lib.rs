//! hoststat - host resource sampler library.
//!
//! This library provides the sampling engine used by the `hoststatd` daemon:
//! - `collector` - CPU, memory, disk and network readers and the `Sampler`
//! - `rates` - differencing state for cumulative counters
//! - `alert` - sliding-window CPU threshold alerting
//! - `sink` - destination for computed metrics

pub mod alert;
pub mod collector;
pub mod config;
pub mod model;
pub mod rates;
pub mod sink;
