//! Local child-process backend.
//!
//! Each execution gets a fresh interpreter process with a cleared
//! environment, closed stdin, and its own scratch working directory that is
//! removed afterwards. Output is read concurrently from both pipes and cut
//! at the configured cap.
//!
//! The interpreter leads its own process group. When a run ends, by exit or
//! by timeout, the whole group is killed so nothing it started in the
//! background survives the request or its scratch directory.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use uuid::Uuid;

use crate::backend::{ExecBackend, ExecutionOutput};
use crate::{ExecutorError, SandboxConfig};

/// `PATH` seen by the child process.
const SANDBOX_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

/// Runs code in a child process on the local host.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessBackend;

impl ProcessBackend {
    /// Create the backend.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExecBackend for ProcessBackend {
    async fn run(
        &self,
        config: &SandboxConfig,
        source: &str,
    ) -> Result<ExecutionOutput, ExecutorError> {
        let (program, args) = command_line(config, source);
        let program = resolve_binary(Path::new(&program))?;

        let run_dir = config.scratch_dir.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&run_dir).await?;

        tracing::debug!(
            program = %program.display(),
            run_dir = %run_dir.display(),
            "spawning interpreter"
        );
        let result = run_in_dir(&program, &args, config, &run_dir).await;

        if let Err(e) = tokio::fs::remove_dir_all(&run_dir).await {
            tracing::warn!(
                run_dir = %run_dir.display(),
                error = %e,
                "failed to remove scratch directory"
            );
        }
        result
    }

    async fn health_check(&self, config: &SandboxConfig) -> Result<(), ExecutorError> {
        let program = config
            .wrapper
            .first()
            .map_or_else(|| config.interpreter.clone(), PathBuf::from);
        resolve_binary(&program)?;
        tokio::fs::create_dir_all(&config.scratch_dir).await?;
        Ok(())
    }
}

async fn run_in_dir(
    program: &Path,
    args: &[OsString],
    config: &SandboxConfig,
    run_dir: &Path,
) -> Result<ExecutionOutput, ExecutorError> {
    let mut child = Command::new(program)
        .args(args)
        .current_dir(run_dir)
        .env_clear()
        .env("PATH", SANDBOX_PATH)
        .env("LANG", "C.UTF-8")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .process_group(0)
        .spawn()
        .map_err(|e| ExecutorError::SpawnFailed(format!("exec {}: {e}", program.display())))?;
    let group = child.id().and_then(|id| i32::try_from(id).ok()).map(Pid::from_raw);

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ExecutorError::SpawnFailed("stdout not piped".to_owned()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| ExecutorError::SpawnFailed("stderr not piped".to_owned()))?;
    let limit = config.max_output_bytes;

    let collect = async {
        let (out, err) = tokio::try_join!(read_capped(stdout, limit), read_capped(stderr, limit))?;
        let status = child.wait().await?;
        Ok::<_, std::io::Error>((out, err, status))
    };
    let outcome = tokio::time::timeout(config.timeout, collect).await;

    let result = match outcome {
        Ok(collected) => collected.map_err(ExecutorError::from).map(
            |((stdout, stdout_cut), (stderr, stderr_cut), status)| ExecutionOutput {
                stdout,
                stderr,
                exit_code: status.code(),
                truncated: stdout_cut || stderr_cut,
            },
        ),
        Err(_) => {
            tracing::warn!(
                timeout_ms = config.timeout.as_millis(),
                "execution timed out, killing process group"
            );
            Err(ExecutorError::Timeout {
                after: config.timeout,
            })
        }
    };

    kill_group(group);
    if result.is_err() {
        if let Err(e) = child.kill().await {
            tracing::warn!(error = %e, "failed to kill interpreter process");
        }
    }
    result
}

/// SIGKILL every process left in the run's group.
fn kill_group(group: Option<Pid>) {
    let Some(group) = group else {
        return;
    };
    match killpg(group, Signal::SIGKILL) {
        // Nothing left in the group.
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(pgid = %group, error = %e, "failed to kill process group"),
    }
}

/// Build `wrapper.. interpreter args.. source` and split off the program.
fn command_line(config: &SandboxConfig, source: &str) -> (OsString, Vec<OsString>) {
    let mut argv: Vec<OsString> = config.wrapper.iter().map(OsString::from).collect();
    argv.push(config.interpreter.clone().into_os_string());
    argv.extend(config.interpreter_args.iter().map(OsString::from));
    argv.push(OsString::from(source));
    let program = argv.remove(0);
    (program, argv)
}

/// Keep the first `limit` bytes of `reader` and drain the rest so the child
/// never blocks on a full pipe. Returns whether anything was dropped.
async fn read_capped<R: AsyncRead + Unpin>(
    reader: R,
    limit: usize,
) -> std::io::Result<(Vec<u8>, bool)> {
    let mut kept = Vec::new();
    let mut head = reader.take(u64::try_from(limit).unwrap_or(u64::MAX));
    head.read_to_end(&mut kept).await?;

    let mut rest = head.into_inner();
    let dropped = tokio::io::copy(&mut rest, &mut tokio::io::sink()).await?;
    Ok((kept, dropped > 0))
}

/// Resolve a binary to an absolute path, searching the server's `PATH` for
/// bare names.
fn resolve_binary(path: &Path) -> Result<PathBuf, ExecutorError> {
    if path.is_absolute() {
        if path.exists() {
            return Ok(path.to_owned());
        }
        return Err(ExecutorError::InterpreterNotFound {
            path: path.to_owned(),
        });
    }

    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).map(|dir| dir.join(path)).collect::<Vec<_>>())
        .unwrap_or_default()
        .into_iter()
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| ExecutorError::InterpreterNotFound {
            path: path.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_places_source_last() {
        let config = SandboxConfig::python();
        let (program, args) = command_line(&config, "print(1)");
        assert_eq!(program, OsString::from("python3"));
        assert_eq!(
            args,
            vec![
                OsString::from("-I"),
                OsString::from("-c"),
                OsString::from("print(1)")
            ]
        );
    }

    #[test]
    fn command_line_prefixes_wrapper() {
        let config =
            SandboxConfig::python().with_wrapper(vec!["unshare".to_owned(), "--net".to_owned()]);
        let (program, args) = command_line(&config, "x");
        assert_eq!(program, OsString::from("unshare"));
        assert_eq!(args[0], OsString::from("--net"));
        assert_eq!(args[1], OsString::from("python3"));
        assert_eq!(args.last(), Some(&OsString::from("x")));
    }

    #[tokio::test]
    async fn read_capped_keeps_short_output_whole() {
        let (kept, cut) = match read_capped(&b"hello"[..], 16).await {
            Ok(v) => v,
            Err(e) => panic!("read failed: {e}"),
        };
        assert_eq!(kept, b"hello");
        assert!(!cut);
    }

    #[tokio::test]
    async fn read_capped_truncates_at_limit() {
        let (kept, cut) = match read_capped(&b"0123456789"[..], 4).await {
            Ok(v) => v,
            Err(e) => panic!("read failed: {e}"),
        };
        assert_eq!(kept, b"0123");
        assert!(cut, "dropping bytes must be reported");
    }

    #[tokio::test]
    async fn read_capped_exact_limit_is_not_truncated() {
        let (kept, cut) = match read_capped(&b"abcd"[..], 4).await {
            Ok(v) => v,
            Err(e) => panic!("read failed: {e}"),
        };
        assert_eq!(kept, b"abcd");
        assert!(!cut);
    }

    #[test]
    fn resolve_binary_missing_absolute_path_is_not_found() {
        let result = resolve_binary(Path::new("/nonexistent/cubicle/interpreter"));
        assert!(matches!(result, Err(ExecutorError::InterpreterNotFound { .. })));
    }

    #[test]
    fn resolve_binary_missing_bare_name_is_not_found() {
        let result = resolve_binary(Path::new("cubicle-no-such-interpreter"));
        assert!(matches!(result, Err(ExecutorError::InterpreterNotFound { .. })));
    }

    proptest::proptest! {
        #[test]
        fn proptest_source_is_one_argument(source in ".{0,64}") {
            let config = SandboxConfig::python();
            let (_, args) = command_line(&config, &source);
            proptest::prop_assert_eq!(args.len(), 3);
            proptest::prop_assert_eq!(args.last(), Some(&OsString::from(source.as_str())));
        }
    }
}
