//! Abstractions over the host data sources so readers can be tested and mocked.
//!
//! The `FileSystem` trait lets readers work with the real `/proc` filesystem on
//! Linux or with an in-memory mock. `CommandRunner` does the same for the
//! external memory-reporting command.

use std::io::{self, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Abstraction for reading counter files.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    ///
    /// # Arguments
    /// * `path` - Path to the file to read
    ///
    /// # Returns
    /// The file contents as a string, or an I/O error if the file cannot be read.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// Real filesystem implementation that delegates to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    /// Creates a new `RealFs` instance.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Outcome of running an external command under a deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    /// The command exited; combined stdout and stderr.
    Completed(String),
    /// The deadline passed and the child was killed.
    TimedOut,
}

/// Abstraction for running an external command and capturing its output.
pub trait CommandRunner: Send + Sync {
    /// Runs `program` with `args`, waiting at most `timeout` for it to exit.
    ///
    /// Returns an I/O error if the program cannot be spawned or exits with a
    /// failure status.
    fn run(&self, program: &str, args: &[String], timeout: Duration) -> io::Result<CommandOutput>;
}

/// Runs commands on the host with `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommand;

impl SystemCommand {
    const POLL_INTERVAL: Duration = Duration::from_millis(5);

    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemCommand {
    fn run(&self, program: &str, args: &[String], timeout: Duration) -> io::Result<CommandOutput> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Pipes are drained while waiting so a chatty child never blocks on write.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let start = Instant::now();
        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None => {
                    if start.elapsed() >= timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Ok(CommandOutput::TimedOut);
                    }
                    thread::sleep(Self::POLL_INTERVAL);
                }
            }
        };

        let mut bytes = collect(stdout)?;
        bytes.extend(collect(stderr)?);
        let out = String::from_utf8_lossy(&bytes).into_owned();

        if !status.success() {
            return Err(io::Error::other(format!(
                "{program} exited with {status}: {}",
                out.trim()
            )));
        }
        Ok(CommandOutput::Completed(out))
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<io::Result<Vec<u8>>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn collect(handle: Option<JoinHandle<io::Result<Vec<u8>>>>) -> io::Result<Vec<u8>> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| io::Error::other("pipe reader thread panicked"))?,
        None => Ok(Vec::new()),
    }
}
