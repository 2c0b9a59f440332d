//! Registration payload construction
//!
//! Builds the "register blob" operation that commits a blob's metadata to
//! the ledger before its bytes are accepted by the storage endpoint.
//! Construction is pure apart from reading the clock for the expiration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, UploadError};
use crate::fingerprint::{ChunkPlan, Fingerprint};
use crate::types::UploadRequest;

pub const MILLIS_PER_DAY: i64 = 86_400_000;
pub const MICROS_PER_MILLI: i64 = 1_000;

/// Blob metadata as declared on the ledger
///
/// Fields are private: a payload is immutable once built and is consumed
/// by [`RegistrationPayload::into_transaction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPayload {
    #[serde(rename = "account")]
    owner: String,
    blob_name: String,
    #[serde(rename = "blobMerkleRoot")]
    fingerprint: Fingerprint,
    num_chunksets: u64,
    expiration_micros: i64,
    #[serde(rename = "blobSize")]
    file_size: u64,
}

impl RegistrationPayload {
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn blob_name(&self) -> &str {
        &self.blob_name
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn num_chunksets(&self) -> u64 {
        self.num_chunksets
    }

    /// Expiration in microseconds since the Unix epoch
    pub fn expiration_micros(&self) -> i64 {
        self.expiration_micros
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Wrap the payload into the envelope handed to the signer
    pub fn into_transaction(self) -> TransactionPayload {
        TransactionPayload {
            data: BlobOperation::RegisterBlob(self),
        }
    }
}

/// Ledger operation carried by a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlobOperation {
    RegisterBlob(RegistrationPayload),
}

/// Envelope submitted through a [`crate::submitter::TransactionSubmitter`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPayload {
    pub data: BlobOperation,
}

impl TransactionPayload {
    pub fn registration(&self) -> &RegistrationPayload {
        match &self.data {
            BlobOperation::RegisterBlob(payload) => payload,
        }
    }
}

/// Build a registration payload expiring `expiration_days` from now
pub fn build_registration(
    request: &UploadRequest,
    fingerprint: Fingerprint,
    plan: ChunkPlan,
) -> Result<RegistrationPayload> {
    build_registration_at(request, fingerprint, plan, Utc::now())
}

/// Build a registration payload relative to an explicit instant
pub fn build_registration_at(
    request: &UploadRequest,
    fingerprint: Fingerprint,
    plan: ChunkPlan,
    now: DateTime<Utc>,
) -> Result<RegistrationPayload> {
    request.validate()?;
    if plan.num_chunksets == 0 {
        return Err(UploadError::invalid("chunk plan must contain at least one chunkset"));
    }

    let expiration_micros = expiration_micros(now, request.expiration_days)?;

    Ok(RegistrationPayload {
        owner: request.owner.clone(),
        blob_name: request.blob_name.clone(),
        fingerprint,
        num_chunksets: plan.num_chunksets,
        expiration_micros,
        file_size: request.file_size,
    })
}

/// `(now_ms + days * 86_400_000) * 1000`
fn expiration_micros(now: DateTime<Utc>, expiration_days: u32) -> Result<i64> {
    if expiration_days == 0 {
        return Err(UploadError::invalid("expiration must be at least one day"));
    }

    i64::from(expiration_days)
        .checked_mul(MILLIS_PER_DAY)
        .and_then(|ttl| ttl.checked_add(now.timestamp_millis()))
        .and_then(|millis| millis.checked_mul(MICROS_PER_MILLI))
        .ok_or_else(|| {
            UploadError::InvalidArgument(format!(
                "expiration of {} days is out of range",
                expiration_days
            ))
        })
}
