//! Mock host implementations for testing.
//!
//! This module provides `MockFs` and pre-built scenarios for testing readers
//! without requiring actual Linux `/proc` access or a `free` binary.

mod filesystem;
mod scenarios;

pub use filesystem::MockFs;
