//! Readers for the Linux `/proc` filesystem.
//!
//! This module provides parsers and readers for the CPU, disk and network
//! counters exposed under `/proc`.

pub mod cpu;
pub mod disk;
pub mod network;
pub mod parser;

pub use cpu::CpuReader;
pub use disk::DiskReader;
pub use network::NetworkReader;
