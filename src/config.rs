//! Daemon configuration.
//!
//! A JSON file supplies the base values and command-line flags override
//! individual fields. Keys are accepted in `snake_case` or in the
//! `PascalCase` of older `config.json` files (`Interval`, `Alert.Threshold`).

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collector::SamplerOptions;
use crate::model::IoUnit;
use crate::rates::IoMode;

/// Default sampling interval in seconds.
pub const DEFAULT_INTERVAL_SECS: u64 = 10;

/// Default bound on the memory command, in milliseconds.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 2000;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    /// Failed to parse JSON configuration.
    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    Invalid(String),
}

/// CPU threshold alert settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Average CPU usage (percent) at or above which a window alerts.
    #[serde(alias = "Threshold")]
    pub threshold: f64,

    /// Readings per window; 0 disables alerting.
    #[serde(alias = "Readings")]
    pub readings: usize,

    /// File alert lines are appended to.
    #[serde(alias = "FileName")]
    pub file_name: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            threshold: 80.0,
            readings: 0,
            file_name: "alert.txt".to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sampling interval in seconds.
    #[serde(alias = "Interval")]
    pub interval: u64,

    #[serde(alias = "ProcPath")]
    pub proc_path: String,

    #[serde(alias = "MemoryCommand")]
    pub memory_command: String,

    #[serde(alias = "MemoryArgs")]
    pub memory_args: Vec<String>,

    #[serde(alias = "CommandTimeoutMs")]
    pub command_timeout_ms: u64,

    #[serde(alias = "IoUnit")]
    pub io_unit: IoUnit,

    #[serde(alias = "IoMode")]
    pub io_mode: IoMode,

    #[serde(alias = "Alert")]
    pub alert: AlertConfig,
}

impl Default for Config {
    fn default() -> Self {
        let sampler = SamplerOptions::default();
        Self {
            interval: DEFAULT_INTERVAL_SECS,
            proc_path: sampler.proc_path,
            memory_command: sampler.memory_command,
            memory_args: sampler.memory_args,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
            io_unit: sampler.io_unit,
            io_mode: sampler.io_mode,
            alert: AlertConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// Unknown keys are ignored, so files written for other tools that share
    /// the same `config.json` still load.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if any field is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval == 0 {
            return Err(ConfigError::Invalid(
                "interval must be positive".to_string(),
            ));
        }

        if self.command_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "command_timeout_ms must be positive".to_string(),
            ));
        }

        if !(0.0..=100.0).contains(&self.alert.threshold) {
            return Err(ConfigError::Invalid(format!(
                "alert threshold {} is outside 0..=100",
                self.alert.threshold
            )));
        }

        if self.memory_command.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "memory_command must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// Reader settings derived from this configuration.
    pub fn sampler_options(&self) -> SamplerOptions {
        SamplerOptions {
            proc_path: self.proc_path.clone(),
            memory_command: self.memory_command.clone(),
            memory_args: self.memory_args.clone(),
            command_timeout: Duration::from_millis(self.command_timeout_ms),
            io_unit: self.io_unit,
            io_mode: self.io_mode,
        }
    }
}
