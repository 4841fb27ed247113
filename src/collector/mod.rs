//! Host resource readers.
//!
//! This module samples CPU, memory, disk and network counters from the Linux
//! `/proc` filesystem and an external memory command, with support for
//! mocking so tests run on any OS.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Sampler                            │
//! │  ┌────────────┐ ┌────────────┐ ┌────────────┐ ┌──────────┐  │
//! │  │ CpuReader  │ │ DiskReader │ │ NetReader  │ │ Memory   │  │
//! │  │ /proc/stat │ │ diskstats  │ │ net/dev    │ │ Reader   │  │
//! │  └─────┬──────┘ └─────┬──────┘ └─────┬──────┘ └────┬─────┘  │
//! │        └──────────────┼──────────────┘             │        │
//! │                ┌──────▼──────┐             ┌───────▼──────┐ │
//! │                │  FileSystem │ (trait)     │ CommandRunner│ │
//! │                └──────┬──────┘             └───────┬──────┘ │
//! └───────────────────────┼────────────────────────────┼────────┘
//!                         │                            │
//!              ┌──────────┴───────────┐     ┌──────────┴──────────┐
//!       ┌──────▼──────┐        ┌──────▼─────▼┐              ┌─────▼─────────┐
//!       │   RealFs    │        │   MockFs    │              │ SystemCommand │
//!       │ (Linux)     │        │ (Testing)   │              │ (spawn+wait)  │
//!       └─────────────┘        └─────────────┘              └───────────────┘
//! ```
//!
//! # Usage
//!
//! ## Production (Linux)
//!
//! ```ignore
//! use hoststat::collector::{RealFs, Sampler, SamplerOptions, SystemCommand};
//!
//! let mut sampler = Sampler::new(RealFs::new(), SystemCommand::new(), &SamplerOptions::default());
//! let snapshot = sampler.collect();
//! ```
//!
//! ## Testing (with MockFs)
//!
//! ```
//! use hoststat::collector::{MockFs, Sampler, SamplerOptions};
//!
//! let fs = MockFs::typical_host();
//! let mut sampler = Sampler::new(fs.clone(), fs, &SamplerOptions::default());
//! let snapshot = sampler.collect();
//! assert!(snapshot.cpu_usage.is_some());
//! assert!(sampler.last_failures().is_empty());
//! ```

pub mod error;
pub mod memory;
pub mod mock;
pub mod procfs;
mod sampler;
pub mod traits;

pub use error::CollectError;
pub use memory::MemoryReader;
pub use mock::MockFs;
pub use sampler::{Reader, Sampler, SamplerOptions, SamplerTiming};
pub use traits::{CommandOutput, CommandRunner, FileSystem, RealFs, SystemCommand};
