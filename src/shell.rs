//! Line-oriented capture of helper command output.
//!
//! The engine never needs a shell for its core data; helper commands are an
//! optional source (e.g. a vendor CMA tool). They are run without a shell and
//! only from one configured directory.

use std::path::{Component, Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

use crate::error::{DumpError, Result};

/// Capability to run a helper command and capture its stdout as lines.
pub trait CommandRunner: Send + Sync {
    fn run_capture(&self, command: &str) -> Result<Vec<String>>;
}

/// Runs commands whose program lives under a fixed directory.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    bin_dir: PathBuf,
}

impl ShellRunner {
    pub fn new(bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin_dir: bin_dir.into(),
        }
    }

    /// Returns true when `command`'s program is inside the allowed directory.
    pub fn is_allowed(&self, command: &str) -> bool {
        let Some(program) = command.split_whitespace().next() else {
            return false;
        };
        let program = Path::new(program);
        program.is_absolute()
            && program.starts_with(&self.bin_dir)
            && !program.components().any(|c| c == Component::ParentDir)
    }
}

impl CommandRunner for ShellRunner {
    fn run_capture(&self, command: &str) -> Result<Vec<String>> {
        if !self.is_allowed(command) {
            return Err(DumpError::CommandRejected(format!(
                "'{}' is not under {}",
                command,
                self.bin_dir.display()
            )));
        }

        let mut parts = command.split_whitespace();
        // is_allowed guarantees a first token
        let program = parts.next().unwrap_or_default();

        debug!("Running helper command: {}", command);
        let output = Command::new(program)
            .args(parts)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|source| DumpError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .map(|l| l.trim_end_matches('\r').to_string())
            .collect())
    }
}
