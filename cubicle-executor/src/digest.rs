use std::fmt;

use sha2::{Digest, Sha256};

/// A SHA-256 content hash, recorded for executions and saved snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Creates a `ContentHash` from a raw 32-byte array.
    #[must_use]
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hash a single byte slice.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Compute SHA-256 hash of stdout + stderr concatenated.
///
/// `H(output) = SHA-256(stdout || stderr)`
#[must_use]
pub fn compute_hash(stdout: &[u8], stderr: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(stdout);
    hasher.update(stderr);
    ContentHash::new(hasher.finalize().into())
}
