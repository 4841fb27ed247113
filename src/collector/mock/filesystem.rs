//! In-memory mock host for testing readers without real `/proc`.
//!
//! `MockFs` simulates counter files and command output in memory, allowing
//! tests to run on macOS and in CI environments without Linux. Clones share
//! the same contents, so a test can change `/proc` under a running reader.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crate::collector::traits::{CommandOutput, CommandRunner, FileSystem};

#[derive(Debug, Clone)]
enum MockCommand {
    Output(String),
    Hang,
}

#[derive(Debug, Default)]
struct MockState {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
    /// Map from program name to its canned behaviour.
    commands: HashMap<String, MockCommand>,
}

/// In-memory files and commands for testing.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    state: Arc<RwLock<MockState>>,
}

impl MockFs {
    /// Creates a new empty mock host.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, MockState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, MockState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Adds (or replaces) a file with the given content.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.write()
            .files
            .insert(path.as_ref().to_path_buf(), content.into());
    }

    /// Removes a file, making reads of it fail with `NotFound`.
    pub fn remove_file(&mut self, path: impl AsRef<Path>) {
        self.write().files.remove(path.as_ref());
    }

    /// Makes `program` print `output` and exit successfully.
    pub fn add_command_output(&mut self, program: &str, output: impl Into<String>) {
        self.write()
            .commands
            .insert(program.to_string(), MockCommand::Output(output.into()));
    }

    /// Makes `program` never finish, so every run hits its deadline.
    pub fn add_hung_command(&mut self, program: &str) {
        self.write()
            .commands
            .insert(program.to_string(), MockCommand::Hang);
    }

    /// Forgets `program`, making runs of it fail as if it were not installed.
    pub fn remove_command(&mut self, program: &str) {
        self.write().commands.remove(program);
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.read().files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }
}

impl CommandRunner for MockFs {
    fn run(&self, program: &str, _args: &[String], _timeout: Duration) -> io::Result<CommandOutput> {
        match self.read().commands.get(program) {
            Some(MockCommand::Output(out)) => Ok(CommandOutput::Completed(out.clone())),
            Some(MockCommand::Hang) => Ok(CommandOutput::TimedOut),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("command not found: {}", program),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fs_add_file() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/stat", "cpu  1 2 3 4 5 6 7 8 9 10\n");

        let content = fs.read_to_string(Path::new("/proc/stat")).unwrap();
        assert_eq!(content, "cpu  1 2 3 4 5 6 7 8 9 10\n");
    }

    #[test]
    fn test_mock_fs_remove_file() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/stat", "cpu 1 2 3 4\n");
        fs.remove_file("/proc/stat");

        let err = fs.read_to_string(Path::new("/proc/stat")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_mock_fs_clones_share_contents() {
        let mut fs = MockFs::new();
        let reader = fs.clone();
        fs.add_file("/proc/stat", "cpu 1 2 3 4\n");

        assert!(reader.read_to_string(Path::new("/proc/stat")).is_ok());
    }

    #[test]
    fn test_mock_commands() {
        let mut fs = MockFs::new();
        fs.add_command_output("free", "MemUse 1 MemFree 1\n");
        fs.add_hung_command("slow");
        let timeout = Duration::from_secs(1);

        assert_eq!(
            fs.run("free", &[], timeout).unwrap(),
            CommandOutput::Completed("MemUse 1 MemFree 1\n".to_string())
        );
        assert_eq!(fs.run("slow", &[], timeout).unwrap(), CommandOutput::TimedOut);
        assert!(fs.run("missing", &[], timeout).is_err());

        fs.remove_command("free");
        assert!(fs.run("free", &[], timeout).is_err());
    }
}
