//! Upload Orchestrator
//!
//! Sequences one upload attempt:
//!
//! ```text
//! Idle → Fingerprinting → Registering → Transferring → Completed
//!   └──────────┴──────────────┴─────────────┴──→ Failed(kind)
//! ```
//!
//! Registration is always fully resolved before a single byte is
//! transferred, because the storage endpoint validates incoming bytes
//! against the registered fingerprint and chunk count.
//!
//! A transfer failure after a successful registration is not rolled back.
//! The registration stays on the ledger without bytes (orphaned) and the
//! error carries its transaction id. Re-running the whole flow registers
//! again; nothing here deduplicates.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{FailureKind, Result, UploadError};
use crate::fingerprint::{fingerprint, fingerprint_file, plan_chunks, Fingerprint};
use crate::registration::{build_registration, TransactionPayload};
use crate::submitter::{TransactionOutcome, TransactionSubmitter};
use crate::transfer::{blob_endpoint, BlobTransferClient, TransferError, TransferOutcome};
use crate::types::{UploadRequest, UploadResult};

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Fingerprinting,
    Registering,
    Transferring,
    Completed,
    Failed(FailureKind),
}

impl UploadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }

    /// Forward-only: each state may move to the next one or to `Failed`
    pub fn can_advance_to(&self, next: UploadState) -> bool {
        use UploadState::*;
        match (self, next) {
            (Completed, _) | (Failed(_), _) => false,
            (_, Failed(_)) => true,
            (Idle, Fingerprinting)
            | (Fingerprinting, Registering)
            | (Registering, Transferring)
            | (Transferring, Completed) => true,
            _ => false,
        }
    }
}

/// State of a single in-flight attempt
struct Attempt {
    blob_name: String,
    state: UploadState,
}

impl Attempt {
    fn new(blob_name: String) -> Self {
        Self {
            blob_name,
            state: UploadState::Idle,
        }
    }

    fn advance(&mut self, next: UploadState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal upload transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!(blob_name = %self.blob_name, from = ?self.state, to = ?next, "Upload state change");
        self.state = next;
    }

    fn fail(&mut self, err: UploadError) -> UploadError {
        tracing::warn!(
            blob_name = %self.blob_name,
            stage = ?self.state,
            kind = ?err.kind(),
            error = %err,
            "Upload failed"
        );
        self.advance(UploadState::Failed(err.kind()));
        err
    }
}

// ============================================================================
// Report
// ============================================================================

/// Everything known about a completed upload
#[derive(Debug, Clone)]
pub struct UploadReport {
    pub result: UploadResult,
    pub fingerprint: Fingerprint,
    pub num_chunksets: u64,
    pub file_size: u64,
    pub transfer: TransferOutcome,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Runs upload attempts against one storage endpoint
///
/// Holds no per-attempt state, so a single orchestrator can drive several
/// uploads concurrently. The submitter is the only shared collaborator.
#[derive(Clone)]
pub struct UploadOrchestrator {
    submitter: Arc<dyn TransactionSubmitter>,
    transfer: BlobTransferClient,
    storage_endpoint: String,
    submit_timeout: Option<Duration>,
}

impl UploadOrchestrator {
    pub fn new(
        submitter: Arc<dyn TransactionSubmitter>,
        transfer: BlobTransferClient,
        storage_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            submitter,
            transfer,
            storage_endpoint: storage_endpoint.into(),
            submit_timeout: None,
        }
    }

    /// Bound how long registration may take before the attempt fails with `Timeout`
    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = Some(timeout);
        self
    }

    /// Read a file and upload it
    ///
    /// `blob_name` defaults to the file name. The read happens in the
    /// fingerprinting stage, so an unreadable file fails the attempt with
    /// `IoFailure` before anything is registered.
    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        blob_name: Option<String>,
        expiration_days: u32,
        owner: impl Into<String>,
    ) -> Result<UploadReport> {
        let path = path.as_ref();
        let blob_name = match blob_name {
            Some(name) => name,
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    UploadError::InvalidArgument(format!("{} has no file name", path.display()))
                })?,
        };

        let mut attempt = Attempt::new(blob_name.clone());
        attempt.advance(UploadState::Fingerprinting);
        let (bytes, digest) = fingerprint_file(path).await.map_err(|e| attempt.fail(e))?;

        let request = UploadRequest::new(bytes, blob_name, expiration_days, owner);
        request.validate().map_err(|e| attempt.fail(e))?;

        self.register_and_transfer(attempt, request, digest).await
    }

    /// Run one full attempt: fingerprint, register, transfer
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadReport> {
        let mut attempt = Attempt::new(request.blob_name.clone());

        request.validate().map_err(|e| attempt.fail(e))?;

        attempt.advance(UploadState::Fingerprinting);
        let digest = fingerprint(&request.file_bytes);

        self.register_and_transfer(attempt, request, digest).await
    }

    async fn register_and_transfer(
        &self,
        mut attempt: Attempt,
        request: UploadRequest,
        digest: Fingerprint,
    ) -> Result<UploadReport> {
        let plan = plan_chunks(request.file_size);
        tracing::debug!(
            blob_name = %request.blob_name,
            fingerprint = %digest,
            num_chunksets = plan.num_chunksets,
            size = request.file_size,
            "Fingerprint computed"
        );

        attempt.advance(UploadState::Registering);
        let payload = build_registration(&request, digest.clone(), plan).map_err(|e| attempt.fail(e))?;
        let outcome = self
            .submit_registration(payload.into_transaction())
            .await
            .map_err(|e| attempt.fail(e))?;
        tracing::info!(
            blob_name = %request.blob_name,
            transaction_id = %outcome.transaction_id,
            "Registration accepted"
        );

        attempt.advance(UploadState::Transferring);
        let storage_url = blob_endpoint(&self.storage_endpoint, &request.owner, &request.blob_name);
        let transfer = self
            .transfer
            .transfer(&storage_url, &request.file_bytes, request.file_size)
            .await
            .map_err(|e| {
                let err = match e {
                    TransferError::Exhausted { attempts, last_error } => UploadError::TransferFailed {
                        transaction_id: outcome.transaction_id.clone(),
                        storage_url: storage_url.clone(),
                        attempts,
                        reason: last_error.to_string(),
                    },
                    TransferError::InvalidArgument(msg) => UploadError::InvalidArgument(msg),
                };
                attempt.fail(err)
            })?;

        attempt.advance(UploadState::Completed);
        tracing::info!(
            blob_name = %request.blob_name,
            storage_url = %storage_url,
            attempts = transfer.attempts_used,
            "Upload complete"
        );

        Ok(UploadReport {
            result: UploadResult {
                blob_id: request.blob_name,
                storage_url,
                transaction_id: outcome.transaction_id,
            },
            fingerprint: digest,
            num_chunksets: plan.num_chunksets,
            file_size: request.file_size,
            transfer,
        })
    }

    async fn submit_registration(
        &self,
        transaction: TransactionPayload,
    ) -> Result<TransactionOutcome> {
        let submission = self.submitter.submit(transaction);

        let outcome = match self.submit_timeout {
            Some(limit) => tokio::time::timeout(limit, submission).await.map_err(|_| {
                UploadError::Timeout(format!("registration not confirmed within {:?}", limit))
            })??,
            None => submission.await?,
        };

        if outcome.transaction_id.trim().is_empty() {
            return Err(UploadError::SubmissionRejected(
                "submitter returned no transaction id".to_string(),
            ));
        }

        Ok(outcome)
    }
}
