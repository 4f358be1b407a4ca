//! Error types for the memory report engine.
//!
//! Only conditions a caller may want to act on are represented here. Malformed
//! lines in kernel sources are skipped by the parsers and never surface as errors.

use std::path::PathBuf;

/// Errors produced while collecting memory data.
#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    /// A kernel data source could not be opened or read.
    #[error("Source unavailable: {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The device memory tracking service could not be queried.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// A command was refused because it lies outside the allowed directory.
    #[error("Command rejected: {0}")]
    CommandRejected(String),

    /// A command could not be spawned.
    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Discovery of register description files failed.
    #[error("Discovery failed under {path}: {source}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Classification rules could not be loaded.
    #[error("Invalid region rules: {0}")]
    Rules(String),

    /// Invalid effective configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl DumpError {
    /// Wraps an I/O error for the given source path.
    pub fn source_unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DumpError::SourceUnavailable {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DumpError>;
