//! Upload history types

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::UploadError;
use crate::orchestrator::UploadReport;
use crate::retrieval::RetrievalCheck;

/// Content type recorded when the blob name has no recognised extension
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Success,
    /// Registered on the ledger but the bytes never arrived
    Error,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "success" => Some(Self::Success),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// One entry of the local upload history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    /// Blob id (the blob name)
    pub id: String,
    pub name: String,
    pub size: u64,
    /// MIME type guessed from the name
    #[serde(rename = "type")]
    pub content_type: String,
    pub url: String,
    pub transaction_hash: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub expiration_days: u32,
    pub status: UploadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_result: Option<RetrievalCheck>,
}

impl UploadRecord {
    /// Record for a completed upload
    pub fn from_report(report: &UploadReport, expiration_days: u32) -> Self {
        let result = &report.result;
        Self {
            id: result.blob_id.clone(),
            name: result.blob_id.clone(),
            size: report.file_size,
            content_type: guess_content_type(&result.blob_id),
            url: result.storage_url.clone(),
            transaction_hash: result.transaction_id.clone(),
            timestamp: Utc::now().timestamp_millis(),
            expiration_days,
            status: UploadStatus::Success,
            test_result: None,
        }
    }

    /// Record for a registration whose transfer failed
    ///
    /// `None` unless the error left an orphaned registration behind.
    pub fn orphaned(
        err: &UploadError,
        blob_name: &str,
        size: u64,
        expiration_days: u32,
    ) -> Option<Self> {
        match err {
            UploadError::TransferFailed {
                transaction_id,
                storage_url,
                ..
            } => Some(Self {
                id: blob_name.to_string(),
                name: blob_name.to_string(),
                size,
                content_type: guess_content_type(blob_name),
                url: storage_url.clone(),
                transaction_hash: transaction_id.clone(),
                timestamp: Utc::now().timestamp_millis(),
                expiration_days,
                status: UploadStatus::Error,
                test_result: None,
            }),
            _ => None,
        }
    }
}

pub fn guess_content_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_raw()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint;
    use crate::transfer::TransferOutcome;
    use crate::types::UploadResult;

    fn create_test_report() -> UploadReport {
        UploadReport {
            result: UploadResult {
                blob_id: "photo.png".to_string(),
                storage_url: "http://localhost/v1/blobs/0xabc/photo.png".to_string(),
                transaction_id: "0xTX1".to_string(),
            },
            fingerprint: fingerprint(b"png"),
            num_chunksets: 1,
            file_size: 3,
            transfer: TransferOutcome {
                success: true,
                attempts_used: 1,
            },
        }
    }

    #[test]
    fn test_record_from_report() {
        let record = UploadRecord::from_report(&create_test_report(), 30);
        assert_eq!(record.id, "photo.png");
        assert_eq!(record.content_type, "image/png");
        assert_eq!(record.transaction_hash, "0xTX1");
        assert_eq!(record.status, UploadStatus::Success);
        assert_eq!(record.expiration_days, 30);
    }

    #[test]
    fn test_orphaned_record_only_for_transfer_failures() {
        let err = UploadError::TransferFailed {
            transaction_id: "0xTX9".to_string(),
            storage_url: "http://localhost/v1/blobs/0xabc/data.bin".to_string(),
            attempts: 3,
            reason: "HTTP 503".to_string(),
        };
        let record = UploadRecord::orphaned(&err, "data.bin", 10, 7).unwrap();
        assert_eq!(record.status, UploadStatus::Error);
        assert_eq!(record.transaction_hash, "0xTX9");
        assert_eq!(record.content_type, DEFAULT_CONTENT_TYPE);

        let err = UploadError::SubmissionRejected("declined".to_string());
        assert!(UploadRecord::orphaned(&err, "data.bin", 10, 7).is_none());
    }

    #[test]
    fn test_persisted_shape() {
        let record = UploadRecord::from_report(&create_test_report(), 30);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "image/png");
        assert_eq!(json["transactionHash"], "0xTX1");
        assert_eq!(json["expirationDays"], 30);
        assert_eq!(json["status"], "success");
        assert!(json.get("testResult").is_none());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [UploadStatus::Pending, UploadStatus::Success, UploadStatus::Error] {
            assert_eq!(UploadStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(UploadStatus::parse("unknown"), None);
    }
}
