//! hoststatd - Host resource sampler daemon.
//!
//! Samples CPU, memory, disk and network counters at a fixed interval,
//! publishes them to an in-memory metrics registry and appends CPU threshold
//! alerts to a file.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use hoststat::alert::{AlertEvaluator, FileAlertSink};
#[cfg(not(target_os = "linux"))]
use hoststat::collector::MockFs;
#[cfg(target_os = "linux")]
use hoststat::collector::{RealFs, SystemCommand};
use hoststat::collector::{CommandRunner, FileSystem, Sampler};
use hoststat::config::Config;
use hoststat::model::{IoUnit, Snapshot};
use hoststat::rates::IoMode;
use hoststat::sink::MetricsRegistry;

/// Host resource sampler daemon.
#[derive(Parser)]
#[command(name = "hoststatd", about = "Host resource sampler daemon", version)]
struct Args {
    /// JSON configuration file. Flags below override its values.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Sampling interval in seconds.
    #[arg(short, long)]
    interval: Option<u64>,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long)]
    proc_path: Option<String>,

    /// CPU usage (percent) at or above which a full window alerts.
    #[arg(long)]
    threshold: Option<f64>,

    /// Readings per alert window. 0 disables alerting.
    #[arg(long)]
    readings: Option<usize>,

    /// File alert lines are appended to.
    #[arg(long, value_name = "PATH")]
    alert_file: Option<String>,

    /// Unit for disk and network volumes: bytes, kilobytes or megabytes.
    #[arg(long, value_parser = parse_io_unit)]
    io_unit: Option<IoUnit>,

    /// Export cumulative disk/network totals or per-interval volumes: cumulative or rate.
    #[arg(long, value_parser = parse_io_mode)]
    io_mode: Option<IoMode>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

fn parse_io_unit(s: &str) -> Result<IoUnit, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "b" | "bytes" => Ok(IoUnit::Bytes),
        "k" | "kb" | "kilobytes" => Ok(IoUnit::Kilobytes),
        "m" | "mb" | "megabytes" => Ok(IoUnit::Megabytes),
        _ => Err(format!("invalid unit '{}': expected bytes, kilobytes or megabytes", s)),
    }
}

fn parse_io_mode(s: &str) -> Result<IoMode, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "cumulative" => Ok(IoMode::Cumulative),
        "rate" => Ok(IoMode::Rate),
        _ => Err(format!("invalid mode '{}': expected cumulative or rate", s)),
    }
}

/// Builds the effective configuration: file first, then flags.
fn resolve_config(args: &Args) -> Result<Config, hoststat::config::ConfigError> {
    let mut config = match args.config {
        Some(ref path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(interval) = args.interval {
        config.interval = interval;
    }
    if let Some(ref proc_path) = args.proc_path {
        config.proc_path = proc_path.clone();
    }
    if let Some(threshold) = args.threshold {
        config.alert.threshold = threshold;
    }
    if let Some(readings) = args.readings {
        config.alert.readings = readings;
    }
    if let Some(ref alert_file) = args.alert_file {
        config.alert.file_name = alert_file.clone();
    }
    if let Some(io_unit) = args.io_unit {
        config.io_unit = io_unit;
    }
    if let Some(io_mode) = args.io_mode {
        config.io_mode = io_mode;
    }

    config.validate()?;
    Ok(config)
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["hoststatd", "hoststat"] {
        match format!("{}={}", target, level).parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("invalid log directive for {}: {}", target, e),
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Describes the contents of a snapshot for logging.
fn describe_snapshot(snapshot: &Snapshot) -> String {
    let mut parts: Vec<String> = Vec::new();

    match snapshot.cpu_usage {
        Some(cpu) => parts.push(format!("cpu {:.1}%", cpu)),
        None => parts.push("cpu -".to_string()),
    }
    match snapshot.memory_usage {
        Some(mem) => parts.push(format!("mem {:.1}%", mem)),
        None => parts.push("mem -".to_string()),
    }
    parts.push(format!("{} disks", snapshot.disks.len()));
    parts.push(format!("{} interfaces", snapshot.networks.len()));

    parts.join(", ")
}

/// Time left to sleep so the next tick starts one interval after this one.
///
/// A tick that overran the interval is followed immediately by the next.
fn sleep_budget(interval: Duration, tick_time: Duration) -> Duration {
    interval.saturating_sub(tick_time)
}

/// Runs the sampling loop until `running` is cleared.
fn run_sampler<F, C>(
    mut sampler: Sampler<F, C>,
    config: &Config,
    metrics: Arc<MetricsRegistry>,
    running: Arc<AtomicBool>,
) where
    F: FileSystem + Clone,
    C: CommandRunner,
{
    let interval = config.interval();
    let mut evaluator = AlertEvaluator::new(config.alert.threshold, config.alert.readings, interval);
    let mut alerts = FileAlertSink::new(&config.alert.file_name);
    let mut tick_count: u64 = 0;

    if evaluator.is_enabled() {
        info!(
            "Alerting: threshold={}%, window={} readings, file={}",
            config.alert.threshold,
            config.alert.readings,
            alerts.path().display()
        );
    } else {
        info!("Alerting: disabled (window of 0 readings)");
    }

    info!("Starting sampling loop");

    while running.load(Ordering::SeqCst) {
        let tick_start = Instant::now();
        let (snapshot, _) = sampler.tick(&metrics, &mut evaluator, &mut alerts);
        tick_count += 1;

        info!("Tick #{}: {}", tick_count, describe_snapshot(&snapshot));
        if let Some(timing) = sampler.last_timing() {
            debug!(
                total = ?timing.total,
                cpu = ?timing.cpu,
                memory = ?timing.memory,
                disk = ?timing.disk,
                network = ?timing.network,
                "tick timing"
            );
        }

        // Sleep with periodic checks for shutdown signal. Ticks start one
        // interval apart, so alert spans of readings x interval hold.
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = sleep_budget(interval, tick_start.elapsed());
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }

    let export = metrics.export();
    info!(
        "Sampling stopped after {} ticks, {} values published",
        tick_count, export.updates
    );
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    let config = match resolve_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("hoststatd {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: interval={}s, proc={}, memory_command={} {}, io_unit={:?}, io_mode={:?}",
        config.interval,
        config.proc_path,
        config.memory_command,
        config.memory_args.join(" "),
        config.io_unit,
        config.io_mode
    );

    let options = config.sampler_options();

    #[cfg(target_os = "linux")]
    let sampler = Sampler::new(RealFs::new(), SystemCommand::new(), &options);
    #[cfg(not(target_os = "linux"))]
    let sampler = {
        warn!("No /proc on this platform, sampling a simulated host");
        let fs = MockFs::typical_host();
        Sampler::new(fs.clone(), fs, &options)
    };

    let metrics = Arc::new(MetricsRegistry::new());

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let worker = {
        let metrics = Arc::clone(&metrics);
        let running = Arc::clone(&running);
        std::thread::Builder::new()
            .name("sampler".to_string())
            .spawn(move || run_sampler(sampler, &config, metrics, running))
    };

    let handle = match worker {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start sampling thread: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if handle.join().is_err() {
        error!("Sampling thread panicked");
        return ExitCode::FAILURE;
    }

    info!("Shutdown complete");
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoststat::model::{DiskIo, NetIo};

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["hoststatd"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn describe_snapshot_lists_all_readers() {
        let mut snapshot = Snapshot {
            timestamp: 0,
            cpu_usage: Some(12.345),
            memory_usage: None,
            ..Default::default()
        };
        snapshot.disks.insert("sda".to_string(), DiskIo::default());
        snapshot.networks.insert("lo".to_string(), NetIo::default());
        snapshot.networks.insert("eth0".to_string(), NetIo::default());

        let desc = describe_snapshot(&snapshot);
        assert!(desc.contains("cpu 12.3%"));
        assert!(desc.contains("mem -"));
        assert!(desc.contains("1 disks"));
        assert!(desc.contains("2 interfaces"));
    }

    #[test]
    fn flags_override_defaults() {
        let config = resolve_config(&args(&[
            "--interval",
            "3",
            "--readings",
            "5",
            "--threshold",
            "70",
            "--io-unit",
            "kb",
            "--io-mode",
            "rate",
        ]))
        .unwrap();

        assert_eq!(config.interval, 3);
        assert_eq!(config.alert.readings, 5);
        assert_eq!(config.alert.threshold, 70.0);
        assert_eq!(config.io_unit, IoUnit::Kilobytes);
        assert_eq!(config.io_mode, IoMode::Rate);
    }

    #[test]
    fn invalid_override_is_rejected() {
        assert!(resolve_config(&args(&["--interval", "0"])).is_err());
        assert!(resolve_config(&args(&["--threshold", "150"])).is_err());
    }

    #[test]
    fn sleep_budget_accounts_for_tick_time() {
        let interval = Duration::from_secs(10);
        assert_eq!(
            sleep_budget(interval, Duration::from_millis(250)),
            Duration::from_millis(9750)
        );
        assert_eq!(sleep_budget(interval, Duration::ZERO), interval);
        assert_eq!(sleep_budget(interval, Duration::from_secs(12)), Duration::ZERO);
    }

    #[test]
    fn parse_io_flags() {
        assert_eq!(parse_io_unit("Bytes"), Ok(IoUnit::Bytes));
        assert_eq!(parse_io_unit("megabytes"), Ok(IoUnit::Megabytes));
        assert!(parse_io_unit("gigabytes").is_err());
        assert_eq!(parse_io_mode("cumulative"), Ok(IoMode::Cumulative));
        assert!(parse_io_mode("delta").is_err());
    }
}
