//! Saved copies of submitted code, one file per save.
//!
//! Files are named after the local time of the save, `YYYY-MM-DD-HHMMSS.py`.
//! A second save within the same second gets `-1`, `-2`, ... appended to the
//! stem instead of overwriting the earlier file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::digest::ContentHash;
use crate::ExecutorError;

const EXTENSION: &str = ".py";

/// Length of `YYYY-MM-DD-HHMMSS`.
const STEM_LEN: usize = 17;

/// Result of a successful save.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct SavedSnapshot {
    /// File name inside the snapshot directory.
    pub name: String,
    /// Full path of the written file.
    pub path: PathBuf,
    /// SHA-256 of the saved text.
    pub digest: ContentHash,
    /// Size of the saved text in bytes.
    pub bytes: usize,
}

/// Directory of saved snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl SnapshotStore {
    /// Store snapshots under `dir`, refusing texts larger than `max_bytes`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    /// The snapshot directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save `code` under the current local time.
    ///
    /// # Errors
    /// Returns [`ExecutorError::SnapshotTooLarge`] if `code` exceeds the
    /// limit, or [`ExecutorError::Io`] if the file cannot be written.
    pub async fn save(&self, code: &str) -> Result<SavedSnapshot, ExecutorError> {
        self.save_at(code, Local::now()).await
    }

    /// Save `code` as if it were submitted at `at`.
    ///
    /// # Errors
    /// Same as [`save`](Self::save).
    pub async fn save_at(
        &self,
        code: &str,
        at: DateTime<Local>,
    ) -> Result<SavedSnapshot, ExecutorError> {
        if code.len() > self.max_bytes {
            return Err(ExecutorError::SnapshotTooLarge {
                len: code.len(),
                max: self.max_bytes,
            });
        }
        tokio::fs::create_dir_all(&self.dir).await?;

        let stem = snapshot_stem(at);
        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                format!("{stem}{EXTENSION}")
            } else {
                format!("{stem}-{attempt}{EXTENSION}")
            };
            let path = self.dir.join(&name);

            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(mut file) => {
                    file.write_all(code.as_bytes()).await?;
                    file.flush().await?;

                    let digest = ContentHash::of(code.as_bytes());
                    tracing::info!(%name, bytes = code.len(), %digest, "snapshot saved");
                    return Ok(SavedSnapshot {
                        name,
                        path,
                        digest,
                        bytes: code.len(),
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Read back a saved snapshot.
    ///
    /// # Errors
    /// Returns [`ExecutorError::InvalidSnapshotName`] for names that do not
    /// follow the snapshot pattern (including anything with a path
    /// separator), or [`ExecutorError::SnapshotNotFound`] if no such file
    /// exists.
    pub async fn load(&self, name: &str) -> Result<String, ExecutorError> {
        if !is_valid_snapshot_name(name) {
            return Err(ExecutorError::InvalidSnapshotName(name.to_owned()));
        }
        match tokio::fs::read_to_string(self.dir.join(name)).await {
            Ok(code) => Ok(code),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ExecutorError::SnapshotNotFound(name.to_owned()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Names of all saved snapshots, oldest first.
    ///
    /// Same-second saves are ordered by their numeric suffix.
    ///
    /// # Errors
    /// Returns [`ExecutorError::Io`] if the directory cannot be read.
    pub async fn list(&self) -> Result<Vec<String>, ExecutorError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if is_valid_snapshot_name(name) {
                    names.push(name.to_owned());
                }
            }
        }
        names.sort_by_cached_key(|name| save_order(name));
        Ok(names)
    }
}

/// Sort key putting `STEM.py` before `STEM-1.py`, and `STEM-2.py` before `STEM-10.py`.
fn save_order(name: &str) -> (String, u64) {
    let stem = name.strip_suffix(EXTENSION).unwrap_or(name);
    match stem.split_at_checked(STEM_LEN) {
        Some((base, rest)) if !rest.is_empty() => {
            let suffix = rest.strip_prefix('-').and_then(|n| n.parse().ok());
            (base.to_owned(), suffix.unwrap_or(u64::MAX))
        }
        _ => (stem.to_owned(), 0),
    }
}
