//! Code runner: validates a submission, runs it on a backend, and records
//! what happened.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::backend::{ExecBackend, ExecutionOutput};
use crate::digest::{compute_hash, ContentHash};
use crate::{ExecutorError, SandboxConfig};

/// Everything a caller learns about one execution.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ExecutionResult {
    /// Standard output, lossily decoded and trimmed.
    pub stdout: String,
    /// Standard error, lossily decoded, trailing whitespace removed.
    pub stderr: String,
    /// Exit status; `None` if the process died from a signal.
    pub exit_code: Option<i32>,
    /// Set when output was cut at the configured cap.
    pub truncated: bool,
    /// SHA-256 of the raw stdout followed by the raw stderr.
    pub output_hash: ContentHash,
    /// When the process was started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration including spawn and teardown.
    pub duration: Duration,
}

impl ExecutionResult {
    fn from_output(
        output: &ExecutionOutput,
        started_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_owned(),
            exit_code: output.exit_code,
            truncated: output.truncated,
            output_hash: compute_hash(&output.stdout, &output.stderr),
            started_at,
            duration,
        }
    }

    /// `true` if the program exited with status 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs submitted source text under a fixed [`SandboxConfig`].
///
/// # Cancel Safety
/// Cancel safe as long as the backend is: dropping the future drops the
/// child process handle, which kills it.
pub struct CodeRunner<B: ExecBackend> {
    backend: B,
    config: SandboxConfig,
}

impl<B: ExecBackend> CodeRunner<B> {
    /// Create a runner with the given backend and limits.
    #[must_use]
    pub fn new(backend: B, config: SandboxConfig) -> Self {
        Self { backend, config }
    }

    /// The limits this runner enforces.
    #[must_use]
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Run `source` and capture its output.
    ///
    /// A program that fails is not an error: its exit code and stderr are in
    /// the result. Only failures to run it at all are errors.
    ///
    /// # Errors
    /// Returns [`ExecutorError::SourceTooLarge`] before spawning anything if
    /// the source exceeds the limit, and propagates backend errors such as
    /// [`ExecutorError::Timeout`].
    pub async fn execute(&self, source: &str) -> Result<ExecutionResult, ExecutorError> {
        let max = self.config.max_source_bytes;
        if source.len() > max {
            return Err(ExecutorError::SourceTooLarge {
                len: source.len(),
                max,
            });
        }

        let started_at = Utc::now();
        let wall_start = Instant::now();
        tracing::info!(source_bytes = source.len(), "starting execution");

        let output = self.backend.run(&self.config, source).await?;
        let result = ExecutionResult::from_output(&output, started_at, wall_start.elapsed());

        tracing::info!(
            exit_code = ?result.exit_code,
            output_hash = %result.output_hash,
            truncated = result.truncated,
            elapsed_ms = result.duration.as_millis(),
            "execution complete"
        );
        Ok(result)
    }

    /// Check that the backend can run programs with this runner's config.
    ///
    /// # Errors
    /// Propagates [`ExecBackend::health_check`] errors.
    pub async fn health_check(&self) -> Result<(), ExecutorError> {
        self.backend.health_check(&self.config).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;

    /// Replays a fixed output and counts how often it was asked to run.
    struct ScriptedBackend {
        output: ExecutionOutput,
        runs: AtomicUsize,
    }

    impl ScriptedBackend {
        fn new(stdout: &str, stderr: &str, exit_code: Option<i32>) -> Self {
            Self {
                output: ExecutionOutput {
                    stdout: stdout.as_bytes().to_vec(),
                    stderr: stderr.as_bytes().to_vec(),
                    exit_code,
                    truncated: false,
                },
                runs: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ExecBackend for ScriptedBackend {
        async fn run(
            &self,
            _config: &SandboxConfig,
            _source: &str,
        ) -> Result<ExecutionOutput, ExecutorError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(self.output.clone())
        }

        async fn health_check(&self, _config: &SandboxConfig) -> Result<(), ExecutorError> {
            Ok(())
        }
    }

    struct TimingOutBackend;

    #[async_trait]
    impl ExecBackend for TimingOutBackend {
        async fn run(
            &self,
            config: &SandboxConfig,
            _source: &str,
        ) -> Result<ExecutionOutput, ExecutorError> {
            Err(ExecutorError::Timeout {
                after: config.timeout,
            })
        }

        async fn health_check(&self, _config: &SandboxConfig) -> Result<(), ExecutorError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn stdout_is_trimmed_like_console_output() {
        let runner =
            CodeRunner::new(ScriptedBackend::new("2\n", "", Some(0)), SandboxConfig::python());
        let result = match runner.execute("print(1+1)").await {
            Ok(r) => r,
            Err(e) => panic!("execute failed: {e}"),
        };
        assert_eq!(result.stdout, "2");
        assert!(result.success());
        assert_eq!(result.output_hash, compute_hash(b"2\n", b""));
    }

    #[tokio::test]
    async fn failing_program_surfaces_exit_code_and_stderr() {
        let backend = ScriptedBackend::new("", "NameError: name 'x' is not defined\n", Some(1));
        let runner = CodeRunner::new(backend, SandboxConfig::python());
        let result = match runner.execute("x").await {
            Ok(r) => r,
            Err(e) => panic!("execute failed: {e}"),
        };
        assert!(!result.success());
        assert_eq!(result.exit_code, Some(1));
        assert_eq!(result.stderr, "NameError: name 'x' is not defined");
    }

    #[tokio::test]
    async fn oversized_source_is_rejected_without_running() {
        let backend = Arc::new(ScriptedBackend::new("", "", Some(0)));
        let config = SandboxConfig::python().with_max_source_bytes(8);
        let runner = CodeRunner::new(Arc::clone(&backend), config);

        let result = runner.execute("print('far too long')").await;
        assert!(
            matches!(result, Err(ExecutorError::SourceTooLarge { max: 8, .. })),
            "got {result:?}"
        );
        assert_eq!(backend.runs.load(Ordering::SeqCst), 0, "backend must not be invoked");
    }

    #[tokio::test]
    async fn backend_timeout_propagates() {
        let config = SandboxConfig::python().with_timeout(Duration::from_millis(50));
        let runner = CodeRunner::new(TimingOutBackend, config);
        let result = runner.execute("while True: pass").await;
        assert!(matches!(result, Err(ExecutorError::Timeout { .. })), "got {result:?}");
    }

    #[tokio::test]
    async fn signal_death_is_not_success() {
        let runner = CodeRunner::new(ScriptedBackend::new("", "", None), SandboxConfig::python());
        let result = match runner.execute("import os; os.kill(os.getpid(), 9)").await {
            Ok(r) => r,
            Err(e) => panic!("execute failed: {e}"),
        };
        assert!(!result.success());
        assert_eq!(result.exit_code, None);
    }
}
