//! Parsers for `/proc` filesystem files.
//!
//! These are pure functions that parse the content of the `/proc` counter
//! files into structured data. They are designed to be easily testable with
//! string inputs.

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// A recoverable problem on one line of a multi-row source.
///
/// The row is still reported, with the offending value defaulted to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct LineIssue {
    /// 1-based line number within the source.
    pub line: usize,
    pub message: String,
}

/// Rows parsed from a line-oriented source plus the per-line problems found.
#[derive(Debug, Clone, Default)]
pub struct Parsed<T> {
    pub rows: Vec<T>,
    pub issues: Vec<LineIssue>,
}

// ============ CPU (/proc/stat) ============

/// Number of tick counters on the aggregate `cpu` line.
pub const CPU_FIELDS: usize = 10;

/// Position of `idle` among the tick counters.
pub const CPU_IDLE: usize = 3;

/// Names of the tick counters, in kernel order.
pub const CPU_FIELD_NAMES: [&str; CPU_FIELDS] = [
    "user",
    "nice",
    "system",
    "idle",
    "iowait",
    "irq",
    "softirq",
    "steal",
    "guest",
    "guest_nice",
];

/// Cumulative tick counters from the aggregate `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTicks {
    pub values: [u64; CPU_FIELDS],
}

impl CpuTicks {
    pub fn new(values: [u64; CPU_FIELDS]) -> Self {
        Self { values }
    }

    pub fn idle(&self) -> u64 {
        self.values[CPU_IDLE]
    }
}

/// Parses the first line of `/proc/stat`.
///
/// Format: `cpu  user nice system idle iowait irq softirq steal guest guest_nice`
///
/// Older kernels expose fewer than ten counters; the missing trailing ones
/// read as zero. At least `idle` must be present. Any non-numeric counter
/// fails the whole line.
pub fn parse_cpu_ticks(content: &str) -> Result<CpuTicks, ParseError> {
    let line = content
        .lines()
        .next()
        .ok_or_else(|| ParseError::new("empty stat"))?;
    let mut parts = line.split_whitespace();

    let label = parts
        .next()
        .ok_or_else(|| ParseError::new("empty cpu line"))?;
    if label != "cpu" {
        return Err(ParseError::new(format!(
            "expected aggregate 'cpu' line, got '{}'",
            label
        )));
    }

    let mut ticks = CpuTicks::default();
    let mut seen = 0;
    for (idx, field) in parts.take(CPU_FIELDS).enumerate() {
        ticks.values[idx] = field.parse().map_err(|_| {
            ParseError::new(format!(
                "invalid {} value '{}'",
                CPU_FIELD_NAMES[idx], field
            ))
        })?;
        seen += 1;
    }

    if seen <= CPU_IDLE {
        return Err(ParseError::new(format!(
            "not enough fields in cpu line: expected {}+, got {}",
            CPU_IDLE + 1,
            seen
        )));
    }

    Ok(ticks)
}

// ============ Disk Stats Parser ============

/// Sector counters for one block device from `/proc/diskstats`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiskSectors {
    pub device: String,
    /// Number of sectors read
    pub read_sectors: u64,
    /// Number of sectors written
    pub write_sectors: u64,
}

/// Parses `/proc/diskstats` content.
///
/// Format: major minor name reads r_merged r_sectors r_time writes w_merged w_sectors ...
///
/// Rows too short to carry both sector counters are skipped. A non-numeric
/// sector counter is recorded as an issue and reads as zero.
pub fn parse_diskstats(content: &str) -> Parsed<DiskSectors> {
    let mut parsed = Parsed::default();

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }
        if parts.len() < 10 {
            parsed.issues.push(LineIssue {
                line: line_no,
                message: format!("expected at least 10 fields, got {}", parts.len()),
            });
            continue;
        }

        let device = parts[2].to_string();
        let mut field = |pos: usize, name: &str| -> u64 {
            match parts[pos].parse() {
                Ok(v) => v,
                Err(_) => {
                    parsed.issues.push(LineIssue {
                        line: line_no,
                        message: format!("invalid {} '{}' for {}", name, parts[pos], device),
                    });
                    0
                }
            }
        };
        let read_sectors = field(5, "sectors read");
        let write_sectors = field(9, "sectors written");

        parsed.rows.push(DiskSectors {
            device,
            read_sectors,
            write_sectors,
        });
    }

    parsed
}

// ============ Network Device Stats Parser ============

/// Byte counters for one interface from `/proc/net/dev`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetBytes {
    /// Interface name (eth0, lo, etc.)
    pub interface: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Parses `/proc/net/dev` content.
///
/// Format:
/// Inter-|   Receive                                                |  Transmit
///  face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
///    lo: 1234567     1234    0    0    0     0          0         0  1234567     1234    0    0    0     0       0          0
///
/// The first two lines are headers. The interface name ends at the `:`, which
/// the kernel may glue to the first counter (`eth0:1234`).
pub fn parse_net_dev(content: &str) -> Parsed<NetBytes> {
    let mut parsed = Parsed::default();

    for (idx, line) in content.lines().enumerate().skip(2) {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }

        let Some((name, counters)) = line.split_once(':') else {
            parsed.issues.push(LineIssue {
                line: line_no,
                message: "missing ':' after interface name".to_string(),
            });
            continue;
        };

        let interface = name.trim().to_string();
        let values: Vec<&str> = counters.split_whitespace().collect();
        if values.len() < 9 {
            parsed.issues.push(LineIssue {
                line: line_no,
                message: format!(
                    "expected at least 9 counters for {}, got {}",
                    interface,
                    values.len()
                ),
            });
            continue;
        }

        let mut field = |pos: usize, name: &str| -> u64 {
            match values[pos].parse() {
                Ok(v) => v,
                Err(_) => {
                    parsed.issues.push(LineIssue {
                        line: line_no,
                        message: format!("invalid {} '{}' for {}", name, values[pos], interface),
                    });
                    0
                }
            }
        };
        let rx_bytes = field(0, "bytes received");
        let tx_bytes = field(8, "bytes sent");

        parsed.rows.push(NetBytes {
            interface,
            rx_bytes,
            tx_bytes,
        });
    }

    parsed
}
