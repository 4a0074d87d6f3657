//! Error types for the executor crate.

use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur while running or saving submitted code.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ExecutorError {
    /// Interpreter (or sandbox wrapper) binary not found.
    #[error("interpreter not found at {path}")]
    InterpreterNotFound { path: PathBuf },

    /// The child process could not be started.
    #[error("process spawn failed: {0}")]
    SpawnFailed(String),

    /// The process was killed after exceeding its wall-clock limit.
    #[error("execution did not complete within {}ms", after.as_millis())]
    Timeout { after: Duration },

    /// Submitted source is larger than the configured limit.
    #[error("source is {len} bytes; limit is {max}")]
    SourceTooLarge { len: usize, max: usize },

    /// Snapshot to be saved is larger than the configured limit.
    #[error("snapshot is {len} bytes; limit is {max}")]
    SnapshotTooLarge { len: usize, max: usize },

    /// No saved snapshot has this name.
    #[error("snapshot not found: {0}")]
    SnapshotNotFound(String),

    /// Name does not follow the `YYYY-MM-DD-HHMMSS.py` pattern.
    #[error("invalid snapshot name: {0}")]
    InvalidSnapshotName(String),

    /// Underlying I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
