//! Sliding-window CPU threshold alerting.
//!
//! The evaluator accumulates CPU readings until the window holds the
//! configured number of them, then compares the average against the
//! threshold and starts a fresh window whether or not it fired.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Running state of the current window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AlertWindow {
    /// Readings accumulated since the window opened.
    pub count: usize,
    /// Sum of those readings.
    pub sum: f64,
}

/// A window whose average met or exceeded the threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    pub threshold: f64,
    /// Readings in the closed window.
    pub readings: usize,
    /// Time covered by the window: readings × interval.
    pub elapsed_secs: u64,
    pub average: f64,
    pub raised_at: DateTime<Utc>,
}

impl fmt::Display for AlertEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CPU Usage remained above {} for last {} seconds",
            self.threshold, self.elapsed_secs
        )
    }
}

/// Threshold rule over a fixed number of consecutive CPU readings.
///
/// A window size of zero disables alerting: readings are ignored and no
/// event is ever produced.
#[derive(Debug, Clone)]
pub struct AlertEvaluator {
    threshold: f64,
    readings: usize,
    interval: Duration,
    window: AlertWindow,
}

impl AlertEvaluator {
    pub fn new(threshold: f64, readings: usize, interval: Duration) -> Self {
        Self {
            threshold,
            readings,
            interval,
            window: AlertWindow::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.readings > 0
    }

    pub fn window(&self) -> AlertWindow {
        self.window
    }

    /// Feeds one CPU reading, returning an event when it closes a window
    /// whose average is at or above the threshold.
    pub fn observe(&mut self, cpu_usage: f64) -> Option<AlertEvent> {
        if !self.is_enabled() {
            return None;
        }

        self.window.count += 1;
        self.window.sum += cpu_usage;
        if self.window.count < self.readings {
            return None;
        }

        let AlertWindow { count, sum } = std::mem::take(&mut self.window);
        let average = sum / count as f64;
        (average >= self.threshold).then(|| AlertEvent {
            threshold: self.threshold,
            readings: count,
            elapsed_secs: self.interval.as_secs().saturating_mul(count as u64),
            average,
            raised_at: Utc::now(),
        })
    }
}

/// Failure to deliver an alert.
#[derive(Debug, Error)]
pub enum AlertSinkError {
    #[error("could not write alert to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Destination for alert events.
pub trait AlertSink: Send {
    fn emit(&mut self, event: &AlertEvent) -> Result<(), AlertSinkError>;
}

/// Appends one text line per alert to a file, creating it if needed.
#[derive(Debug, Clone)]
pub struct FileAlertSink {
    path: PathBuf,
}

impl FileAlertSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> io::Result<()> {
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        writeln!(file, "{}", line)
    }
}

impl AlertSink for FileAlertSink {
    fn emit(&mut self, event: &AlertEvent) -> Result<(), AlertSinkError> {
        self.append(&event.to_string())
            .map_err(|source| AlertSinkError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator(threshold: f64, readings: usize) -> AlertEvaluator {
        AlertEvaluator::new(threshold, readings, Duration::from_secs(10))
    }

    fn feed(e: &mut AlertEvaluator, readings: &[f64]) -> Vec<AlertEvent> {
        readings.iter().filter_map(|r| e.observe(*r)).collect()
    }

    #[test]
    fn window_average_above_threshold_fires_once() {
        let mut e = evaluator(80.0, 3);
        let events = feed(&mut e, &[90.0, 85.0, 70.0]);

        assert_eq!(events.len(), 1);
        assert!((events[0].average - 81.666_666).abs() < 1e-3);
        assert_eq!(events[0].readings, 3);
        assert_eq!(events[0].elapsed_secs, 30);
        assert_eq!(e.window(), AlertWindow::default());
    }

    #[test]
    fn window_resets_after_closing() {
        let mut e = evaluator(80.0, 3);
        let events = feed(&mut e, &[90.0, 85.0, 70.0, 10.0]);

        assert_eq!(events.len(), 1);
        assert_eq!(e.window(), AlertWindow { count: 1, sum: 10.0 });
    }

    #[test]
    fn window_below_threshold_resets_silently() {
        let mut e = evaluator(80.0, 2);
        assert!(feed(&mut e, &[50.0, 60.0]).is_empty());
        assert_eq!(e.window().count, 0);

        // The next window is judged on its own readings only.
        let events = feed(&mut e, &[95.0, 95.0]);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn average_equal_to_threshold_fires() {
        let mut e = evaluator(80.0, 2);
        assert_eq!(feed(&mut e, &[70.0, 90.0]).len(), 1);
    }

    #[test]
    fn single_reading_window() {
        let mut e = evaluator(50.0, 1);
        let events = feed(&mut e, &[10.0, 60.0, 40.0, 99.0]);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].elapsed_secs, 10);
    }

    #[test]
    fn zero_window_disables_alerting() {
        let mut e = evaluator(0.0, 0);
        assert!(!e.is_enabled());
        assert!(feed(&mut e, &[100.0, 100.0, 100.0]).is_empty());
        assert_eq!(e.window(), AlertWindow::default());
    }

    #[test]
    fn event_text() {
        let mut e = evaluator(80.0, 3);
        let event = feed(&mut e, &[90.0, 90.0, 90.0]).remove(0);
        assert_eq!(
            event.to_string(),
            "CPU Usage remained above 80 for last 30 seconds"
        );
    }

    #[test]
    fn file_sink_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alert.txt");
        let mut sink = FileAlertSink::new(&path);

        let mut e = evaluator(80.0, 1);
        let first = e.observe(81.0).unwrap();
        let second = e.observe(95.5).unwrap();
        sink.emit(&first).unwrap();
        sink.emit(&second).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "CPU Usage remained above 80 for last 10 seconds\n\
             CPU Usage remained above 80 for last 10 seconds\n"
        );
    }

    #[test]
    fn file_sink_reports_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileAlertSink::new(dir.path().join("missing").join("alert.txt"));

        let mut e = evaluator(0.0, 1);
        let event = e.observe(1.0).unwrap();
        let err = sink.emit(&event).unwrap_err();
        assert!(err.to_string().contains("alert.txt"));
    }
}
