//! Content fingerprinting and chunk planning
//!
//! The fingerprint is what the ledger registration declares as the blob's
//! merkle root, and the chunk plan is the chunkset count the storage
//! endpoint validates incoming bytes against. Both are pure functions of
//! the file content.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, UploadError};

/// Prefix carried by every fingerprint
pub const FINGERPRINT_PREFIX: &str = "0x";

/// Bytes per chunkset, fixed by the Shelby storage protocol
pub const CHUNKSET_SIZE: u64 = 10 * 1024 * 1024;

/// SHA-256 digest of a blob, `0x`-prefixed lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the fingerprint of the full file content
pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Fingerprint(format!("{}{}", FINGERPRINT_PREFIX, hex::encode(hasher.finalize())))
}

/// Read a file once and fingerprint it
///
/// A read failure is an `IoFailure` and is not retried.
pub async fn fingerprint_file(path: impl AsRef<Path>) -> Result<(Vec<u8>, Fingerprint)> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "Failed to read file for fingerprinting");
        UploadError::Io(e)
    })?;
    let digest = fingerprint(&bytes);
    Ok((bytes, digest))
}

/// Number of chunksets a blob of a given size is divided into
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkPlan {
    pub num_chunksets: u64,
}

/// Chunkset count for a file size: `ceil(size / CHUNKSET_SIZE)`, at least one
pub fn plan_chunks(file_size: u64) -> ChunkPlan {
    ChunkPlan {
        num_chunksets: file_size.div_ceil(CHUNKSET_SIZE).max(1),
    }
}
