//! Execution backend abstraction trait.
//!
//! Allows swapping the local child-process backend for a stronger isolator
//! (container, microVM) without changing the runner or the HTTP layer.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{ExecutorError, SandboxConfig};

/// Raw output of one finished execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutput {
    /// Captured standard output, at most `max_output_bytes`.
    pub stdout: Vec<u8>,
    /// Captured standard error, at most `max_output_bytes`.
    pub stderr: Vec<u8>,
    /// Exit status; `None` if the process was ended by a signal.
    pub exit_code: Option<i32>,
    /// Set when either stream was cut at the cap.
    pub truncated: bool,
}

/// Something that can run a program text under a [`SandboxConfig`].
///
/// # Cancel Safety
/// Implementations must not leak processes when the future is dropped.
#[async_trait]
pub trait ExecBackend: Send + Sync {
    /// Run `source` to completion and capture its output.
    ///
    /// # Errors
    /// Returns [`ExecutorError::InterpreterNotFound`] or
    /// [`ExecutorError::SpawnFailed`] if the process cannot start, and
    /// [`ExecutorError::Timeout`] if it outlives `config.timeout`.
    async fn run(
        &self,
        config: &SandboxConfig,
        source: &str,
    ) -> Result<ExecutionOutput, ExecutorError>;

    /// Check that the backend can run programs under `config`.
    ///
    /// # Errors
    /// Returns [`ExecutorError::InterpreterNotFound`] if a required binary is
    /// missing.
    async fn health_check(&self, config: &SandboxConfig) -> Result<(), ExecutorError>;
}

#[async_trait]
impl<T: ExecBackend + ?Sized> ExecBackend for Arc<T> {
    async fn run(
        &self,
        config: &SandboxConfig,
        source: &str,
    ) -> Result<ExecutionOutput, ExecutorError> {
        (**self).run(config, source).await
    }

    async fn health_check(&self, config: &SandboxConfig) -> Result<(), ExecutorError> {
        (**self).health_check(config).await
    }
}
