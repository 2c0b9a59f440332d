//! Blob byte transfer
//!
//! Pushes the raw file to the storage endpoint with a `PUT` and retries a
//! fixed number of times. The whole body is re-sent on every attempt;
//! there is no range resume.
//!
//! Retry is naive: at most [`MAX_ATTEMPTS`] attempts with a
//! fixed [`RETRY_DELAY`] between them, no jitter or backoff.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

/// Total attempts, including the first
pub const MAX_ATTEMPTS: u32 = 3;

/// Wait between attempts
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Storage URL of a blob: `{base}/v1/blobs/{owner}/{name}`, both segments percent-encoded
pub fn blob_endpoint(base: &str, owner: &str, blob_name: &str) -> String {
    format!(
        "{}/v1/blobs/{}/{}",
        base.trim_end_matches('/'),
        urlencoding::encode(owner),
        urlencoding::encode(blob_name)
    )
}

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            delay: RETRY_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOutcome {
    pub success: bool,
    /// 1..=max_attempts
    pub attempts_used: u32,
}

/// Failure of a single attempt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    #[error("storage endpoint returned HTTP {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("gave up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: AttemptError },

    #[error("invalid transfer: {0}")]
    InvalidArgument(String),
}

// ============================================================================
// Transport
// ============================================================================

/// One `PUT` of a full blob body
#[async_trait]
pub trait BlobTransport: Send + Sync {
    /// `Ok` only for a 2xx response
    async fn put_blob(&self, url: &str, body: Vec<u8>, content_length: u64) -> Result<(), AttemptError>;
}

/// reqwest-backed transport
pub struct HttpBlobTransport {
    client: reqwest::Client,
}

impl HttpBlobTransport {
    /// `timeout` bounds each attempt, not the whole transfer
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl BlobTransport for HttpBlobTransport {
    async fn put_blob(&self, url: &str, body: Vec<u8>, content_length: u64) -> Result<(), AttemptError> {
        let response = self
            .client
            .put(url)
            .header(CONTENT_TYPE, OCTET_STREAM)
            .header(CONTENT_LENGTH, content_length)
            .body(body)
            .send()
            .await
            .map_err(|e| AttemptError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AttemptError::Status(status.as_u16()))
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// Transfer client with bounded fixed-delay retry
#[derive(Clone)]
pub struct BlobTransferClient {
    transport: Arc<dyn BlobTransport>,
    policy: RetryPolicy,
}

impl BlobTransferClient {
    pub fn new(transport: Arc<dyn BlobTransport>) -> Self {
        Self::with_policy(transport, RetryPolicy::default())
    }

    pub fn with_policy(transport: Arc<dyn BlobTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Transfer `bytes` to `url`
    ///
    /// Intermediate failures are logged and swallowed; only the last one is
    /// surfaced once the attempt budget is spent.
    pub async fn transfer(&self, url: &str, bytes: &[u8], file_size: u64) -> Result<TransferOutcome, TransferError> {
        if file_size != bytes.len() as u64 {
            return Err(TransferError::InvalidArgument(format!(
                "content length {} does not match {} bytes",
                file_size,
                bytes.len()
            )));
        }

        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.transport.put_blob(url, bytes.to_vec(), file_size).await {
                Ok(()) => {
                    tracing::info!(url = %url, attempt = attempt, size = file_size, "Blob transferred");
                    return Ok(TransferOutcome {
                        success: true,
                        attempts_used: attempt,
                    });
                }
                Err(e) if attempt < max_attempts => {
                    tracing::warn!(
                        url = %url,
                        attempt = attempt,
                        max_attempts = max_attempts,
                        error = %e,
                        "Blob transfer attempt failed, retrying"
                    );
                    tokio::time::sleep(self.policy.delay).await;
                }
                Err(e) => {
                    tracing::error!(url = %url, attempts = attempt, error = %e, "Blob transfer failed");
                    return Err(TransferError::Exhausted {
                        attempts: attempt,
                        last_error: e,
                    });
                }
            }
        }
    }
}
