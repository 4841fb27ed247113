//! Memory usage from an external memory-reporting command.
//!
//! The default command is `free --line --mega`, whose output is a single line
//! of `Key value` pairs:
//!
//! ```text
//! SwapUse           0 CachUse        3101  MemUse        2871 MemFree       10128
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::collector::error::CollectError;
use crate::collector::traits::{CommandOutput, CommandRunner};

static KEY_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)\s+(\d+)").expect("Invalid regex"));

/// Field holding used memory.
pub const USED_FIELD: &str = "MemUse";
/// Field holding free memory.
pub const FREE_FIELD: &str = "MemFree";
/// Optional field holding reclaimable cache, counted as free.
pub const CACHE_FIELD: &str = "CachUse";

/// Extracts every `Key value` pair from command output.
///
/// Returns an empty map when nothing matched, and `Parse` when a matched
/// value does not fit a `u64`.
pub fn parse_key_values(output: &str) -> Result<HashMap<String, u64>, CollectError> {
    let mut fields = HashMap::new();
    for cap in KEY_VALUE.captures_iter(output) {
        let key = &cap[1];
        let value = cap[2].parse::<u64>().map_err(|e| {
            CollectError::Parse(format!("error converting value for key {}: {}", key, e))
        })?;
        fields.insert(key.to_string(), value);
    }
    Ok(fields)
}

/// Computes memory usage in percent from parsed fields.
pub fn memory_usage(fields: &HashMap<String, u64>) -> Result<f64, CollectError> {
    let (Some(&used), Some(&free)) = (fields.get(USED_FIELD), fields.get(FREE_FIELD)) else {
        return Err(CollectError::NoMatch(format!(
            "expected {} and {} in memory command output",
            USED_FIELD, FREE_FIELD
        )));
    };
    let free = free.saturating_add(fields.get(CACHE_FIELD).copied().unwrap_or(0));

    let total = free.saturating_add(used);
    if total == 0 {
        return Err(CollectError::Parse(
            "memory command reported zero total memory".to_string(),
        ));
    }
    Ok(used as f64 * 100.0 / total as f64)
}

/// Reads memory usage by running the configured command.
pub struct MemoryReader<C: CommandRunner> {
    runner: C,
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl<C: CommandRunner> MemoryReader<C> {
    pub fn new(runner: C, program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            runner,
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Runs the command and returns usage in percent.
    pub fn read(&self) -> Result<f64, CollectError> {
        let output = self
            .runner
            .run(&self.program, &self.args, self.timeout)
            .map_err(|e| CollectError::unavailable(&self.program, e))?;

        let text = match output {
            CommandOutput::Completed(text) => text,
            CommandOutput::TimedOut => {
                return Err(CollectError::Timeout {
                    command: self.program.clone(),
                    after: self.timeout,
                });
            }
        };

        let fields = parse_key_values(&text)?;
        if fields.is_empty() {
            return Err(CollectError::NoMatch(format!(
                "no key/value pairs in {} output",
                self.program
            )));
        }
        memory_usage(&fields)
    }
}
