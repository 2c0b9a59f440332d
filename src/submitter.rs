//! Transaction submission boundary
//!
//! Signing and submitting the registration transaction belongs to the
//! caller's wallet. The orchestrator only sees a [`TransactionSubmitter`],
//! shared between concurrent uploads, that either returns a transaction id
//! or fails.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registration::TransactionPayload;

/// Accepted registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutcome {
    pub transaction_id: String,
}

/// Submission failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// Insufficient funds, malformed payload, signer declined, ...
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    #[error("Transaction submission timed out")]
    Timeout,
}

/// Signs and submits a transaction
///
/// Implementations must be safe to call concurrently from independent
/// uploads; no ordering is required between unrelated calls.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    async fn submit(&self, transaction: TransactionPayload) -> Result<TransactionOutcome, SubmitError>;
}

/// Response body of the signer service
#[derive(Debug, Deserialize)]
struct SignerResponse {
    hash: String,
}

/// Submitter backed by a wallet signer service over HTTP
///
/// POSTs the transaction envelope as JSON and expects `{"hash": "0x..."}`.
pub struct RemoteSignerSubmitter {
    client: reqwest::Client,
    url: String,
}

impl RemoteSignerSubmitter {
    pub fn new(url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl TransactionSubmitter for RemoteSignerSubmitter {
    async fn submit(&self, transaction: TransactionPayload) -> Result<TransactionOutcome, SubmitError> {
        let registration = transaction.registration();
        tracing::debug!(
            owner = %registration.owner(),
            blob_name = %registration.blob_name(),
            signer = %self.url,
            "Submitting registration to signer"
        );

        let response = self
            .client
            .post(&self.url)
            .json(&transaction)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SubmitError::Timeout
                } else {
                    SubmitError::Rejected(format!("signer unreachable: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SubmitError::Rejected(format!("signer returned {}: {}", status, body)));
        }

        let body: SignerResponse = response
            .json()
            .await
            .map_err(|e| SubmitError::Rejected(format!("unreadable signer response: {}", e)))?;

        if body.hash.trim().is_empty() {
            return Err(SubmitError::Rejected("signer returned an empty transaction hash".to_string()));
        }

        Ok(TransactionOutcome {
            transaction_id: body.hash,
        })
    }
}
