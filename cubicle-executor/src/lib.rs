//! Bounded execution of submitted code for the Cubicle code gateway.
//!
//! Runs program text in a fresh interpreter process under a time limit and
//! an output cap, and saves submitted code as timestamped snapshots.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod backend;
pub mod config;
pub mod digest;
pub mod error;
pub mod process;
pub mod runner;
pub mod snapshot;

pub use backend::{ExecBackend, ExecutionOutput};
pub use config::SandboxConfig;
pub use digest::{compute_hash, ContentHash};
pub use error::ExecutorError;
pub use process::ProcessBackend;
pub use runner::{CodeRunner, ExecutionResult};
pub use snapshot::{is_valid_snapshot_name, SavedSnapshot, SnapshotStore};
