//! Sandbox limits and interpreter command line.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default wall-clock limit per execution.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default cap on captured bytes per output stream, and on submitted source.
pub const DEFAULT_MAX_BYTES: usize = 64 * 1024;

/// How a submitted program is run and what it may consume.
///
/// The child command line is `wrapper.. interpreter interpreter_args.. <source>`.
/// `wrapper` is where filesystem and network confinement plugs in, e.g.
/// `["unshare", "--net", "--map-root-user"]` or a `bwrap` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct SandboxConfig {
    /// Interpreter binary, looked up in `PATH` when not absolute.
    pub interpreter: PathBuf,

    /// Arguments placed between the interpreter and the source text.
    pub interpreter_args: Vec<String>,

    /// Confinement command prefixed to the interpreter, if any.
    pub wrapper: Vec<String>,

    /// Wall-clock limit; the process is killed when it expires.
    pub timeout: Duration,

    /// Bytes kept from each of stdout and stderr.
    pub max_output_bytes: usize,

    /// Largest accepted source text in bytes.
    pub max_source_bytes: usize,

    /// Parent of the per-execution working directories.
    pub scratch_dir: PathBuf,
}

impl SandboxConfig {
    /// Run code with `interpreter <args..> <source>` and default limits.
    #[must_use]
    pub fn new(interpreter: impl Into<PathBuf>, interpreter_args: Vec<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            interpreter_args,
            wrapper: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            max_output_bytes: DEFAULT_MAX_BYTES,
            max_source_bytes: DEFAULT_MAX_BYTES,
            scratch_dir: std::env::temp_dir().join("cubicle-runs"),
        }
    }

    /// `python3 -I -c <source>`: isolated mode ignores `PYTHON*` variables
    /// and the user site directory.
    #[must_use]
    pub fn python() -> Self {
        Self::new("python3", vec!["-I".to_owned(), "-c".to_owned()])
    }

    /// Replace the wall-clock limit.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the per-stream output cap.
    #[must_use]
    pub fn with_max_output_bytes(mut self, max: usize) -> Self {
        self.max_output_bytes = max;
        self
    }

    /// Replace the source size cap.
    #[must_use]
    pub fn with_max_source_bytes(mut self, max: usize) -> Self {
        self.max_source_bytes = max;
        self
    }

    /// Prefix every command line with `wrapper`.
    #[must_use]
    pub fn with_wrapper(mut self, wrapper: Vec<String>) -> Self {
        self.wrapper = wrapper;
        self
    }

    /// Replace the scratch directory root.
    #[must_use]
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self::python()
    }
}
