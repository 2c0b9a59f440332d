//! Error types for the Shelby uploader

use serde::Serialize;
use thiserror::Error;

use crate::submitter::SubmitError;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, UploadError>;

/// Classification of a failed upload attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// File bytes could not be read
    IoFailure,
    /// Malformed request (caller bug)
    InvalidArgument,
    /// Ledger or signer declined the registration
    SubmissionRejected,
    /// A caller-imposed bound was exceeded
    Timeout,
    /// Byte transfer failed after exhausting the retry budget
    TransferFailed,
}

/// Upload error taxonomy
///
/// None of these are retried by the orchestrator. Retrying the whole flow
/// after `SubmissionRejected` or `TransferFailed` submits a second
/// registration; the ledger does not deduplicate it.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Registration rejected: {0}")]
    SubmissionRejected(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    /// Registration `transaction_id` is committed on the ledger but has no bytes behind it.
    #[error("Transfer failed after {attempts} attempts (registration {transaction_id} left orphaned): {reason}")]
    TransferFailed {
        transaction_id: String,
        storage_url: String,
        attempts: u32,
        reason: String,
    },
}

impl UploadError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Io(_) => FailureKind::IoFailure,
            Self::InvalidArgument(_) => FailureKind::InvalidArgument,
            Self::SubmissionRejected(_) => FailureKind::SubmissionRejected,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::TransferFailed { .. } => FailureKind::TransferFailed,
        }
    }

    /// Transaction id of a registration that was committed without its bytes
    pub fn orphaned_transaction(&self) -> Option<&str> {
        match self {
            Self::TransferFailed { transaction_id, .. } => Some(transaction_id),
            _ => None,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

impl From<SubmitError> for UploadError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Rejected(reason) => Self::SubmissionRejected(reason),
            SubmitError::Timeout => Self::Timeout("registration submission timed out".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let io = UploadError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(io.kind(), FailureKind::IoFailure);
        assert_eq!(UploadError::invalid("x").kind(), FailureKind::InvalidArgument);
        assert_eq!(
            UploadError::from(SubmitError::Rejected("insufficient funds".into())).kind(),
            FailureKind::SubmissionRejected
        );
        assert_eq!(UploadError::from(SubmitError::Timeout).kind(), FailureKind::Timeout);
    }

    #[test]
    fn test_orphaned_transaction_only_for_transfer_failures() {
        let err = UploadError::TransferFailed {
            transaction_id: "0xTX1".to_string(),
            storage_url: "http://localhost/v1/blobs/0xabc/a.txt".to_string(),
            attempts: 3,
            reason: "HTTP 500".to_string(),
        };
        assert_eq!(err.orphaned_transaction(), Some("0xTX1"));
        assert!(err.to_string().contains("orphaned"));

        let err = UploadError::SubmissionRejected("declined".to_string());
        assert_eq!(err.orphaned_transaction(), None);
    }
}
