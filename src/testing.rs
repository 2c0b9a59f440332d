//! Test doubles for the submission and transfer seams.
//!
//! Both fakes count their invocations so tests can assert on ordering
//! (no transfer without a transaction id) and on the retry budget.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::registration::TransactionPayload;
use crate::submitter::{SubmitError, TransactionOutcome, TransactionSubmitter};
use crate::transfer::{AttemptError, BlobTransport};

/// Initialise a tracing subscriber that writes into the test harness output.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Submitter
// ============================================================================

enum SubmitBehavior {
    /// Accept every call, issuing `0xTX1`, `0xTX2`, ...
    Accept,
    Reject(String),
    /// Never resolve
    Hang,
}

pub struct ScriptedSubmitter {
    behavior: SubmitBehavior,
    calls: AtomicU32,
    submitted: Mutex<Vec<TransactionPayload>>,
}

impl ScriptedSubmitter {
    fn with_behavior(behavior: SubmitBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicU32::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn accepting() -> Self {
        Self::with_behavior(SubmitBehavior::Accept)
    }

    pub fn rejecting(reason: &str) -> Self {
        Self::with_behavior(SubmitBehavior::Reject(reason.to_string()))
    }

    pub fn hanging() -> Self {
        Self::with_behavior(SubmitBehavior::Hang)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<TransactionPayload> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl TransactionSubmitter for ScriptedSubmitter {
    async fn submit(&self, transaction: TransactionPayload) -> Result<TransactionOutcome, SubmitError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.submitted.lock().push(transaction);

        match &self.behavior {
            SubmitBehavior::Accept => Ok(TransactionOutcome {
                transaction_id: format!("0xTX{}", call),
            }),
            SubmitBehavior::Reject(reason) => Err(SubmitError::Rejected(reason.clone())),
            SubmitBehavior::Hang => std::future::pending().await,
        }
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Replays a script of attempt results, then falls back to a fixed one
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<(), AttemptError>>>,
    fallback: Result<(), AttemptError>,
    calls: AtomicU32,
    content_lengths: Mutex<Vec<u64>>,
    urls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<(), AttemptError>>, fallback: Result<(), AttemptError>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicU32::new(0),
            content_lengths: Mutex::new(Vec::new()),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn always_ok() -> Self {
        Self::new(Vec::new(), Ok(()))
    }

    pub fn always_failing(error: AttemptError) -> Self {
        Self::new(Vec::new(), Err(error))
    }

    /// Fail with HTTP 500 `failures` times, then succeed
    pub fn failing_then_ok(failures: usize) -> Self {
        Self::new(vec![Err(AttemptError::Status(500)); failures], Ok(()))
    }

    /// Play `script`, succeeding once it runs out
    pub fn scripted(script: Vec<Result<(), AttemptError>>) -> Self {
        Self::new(script, Ok(()))
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_content_length(&self) -> Option<u64> {
        self.content_lengths.lock().last().copied()
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }
}

#[async_trait]
impl BlobTransport for ScriptedTransport {
    async fn put_blob(&self, url: &str, body: Vec<u8>, content_length: u64) -> Result<(), AttemptError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(body.len() as u64, content_length, "body must match declared length");
        self.content_lengths.lock().push(content_length);
        self.urls.lock().push(url.to_string());

        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}
