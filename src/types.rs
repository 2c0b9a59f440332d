//! Upload request and result types

use serde::{Deserialize, Serialize};

use crate::error::{Result, UploadError};

// ============================================================================
// Constants
// ============================================================================

/// Expiration used when the caller does not pick one
pub const DEFAULT_EXPIRATION_DAYS: u32 = 365;

// ============================================================================
// Request
// ============================================================================

/// One file to register and transfer
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Raw file content
    pub file_bytes: Vec<u8>,

    /// Declared size; must equal `file_bytes.len()`
    pub file_size: u64,

    /// Blob name, unique per owner
    pub blob_name: String,

    /// Days until the storage network may drop the blob
    pub expiration_days: u32,

    /// Ledger account that owns the blob
    pub owner: String,
}

impl UploadRequest {
    /// Create a request whose declared size is taken from the bytes
    pub fn new(
        file_bytes: Vec<u8>,
        blob_name: impl Into<String>,
        expiration_days: u32,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            file_size: file_bytes.len() as u64,
            file_bytes,
            blob_name: blob_name.into(),
            expiration_days,
            owner: owner.into(),
        }
    }

    /// Reject malformed requests
    ///
    /// Nothing is clamped or defaulted here: a bad request is a caller bug.
    pub fn validate(&self) -> Result<()> {
        if self.blob_name.trim().is_empty() {
            return Err(UploadError::invalid("blob name must not be empty"));
        }
        if self.owner.trim().is_empty() {
            return Err(UploadError::invalid("owner account must not be empty"));
        }
        if self.expiration_days == 0 {
            return Err(UploadError::invalid("expiration must be at least one day"));
        }
        if self.file_size != self.file_bytes.len() as u64 {
            return Err(UploadError::InvalidArgument(format!(
                "declared size {} does not match {} bytes of content",
                self.file_size,
                self.file_bytes.len()
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Result
// ============================================================================

/// A blob that is both registered and stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    /// Same as the blob name
    pub blob_id: String,

    /// Where the bytes were written
    pub storage_url: String,

    /// Registration transaction
    pub transaction_id: String,
}
