//! Upload history
//!
//! Local record of what was uploaded, kept outside the upload core. The
//! orchestrator never touches it; the caller saves a record after an
//! upload returns.

mod memory;
mod sqlite;
mod types;

pub use memory::MemoryHistoryStore;
pub use sqlite::SqliteHistoryStore;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::retrieval::RetrievalCheck;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

pub type HistoryResult<T> = std::result::Result<T, HistoryError>;

/// Repository of upload records
///
/// Records are keyed by id; saving an existing id replaces it.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn save(&self, record: &UploadRecord) -> HistoryResult<()>;

    /// All records, newest first
    async fn list(&self) -> HistoryResult<Vec<UploadRecord>>;

    async fn get(&self, id: &str) -> HistoryResult<Option<UploadRecord>>;

    /// Returns whether a record was removed
    async fn delete(&self, id: &str) -> HistoryResult<bool>;

    /// Records whose name contains `fragment`, case-insensitive, newest first
    async fn search(&self, fragment: &str) -> HistoryResult<Vec<UploadRecord>>;

    async fn set_test_result(&self, id: &str, check: RetrievalCheck) -> HistoryResult<UploadRecord>;
}

/// Case-insensitive name match shared by every store
///
/// Uses Unicode lowercasing, so `"été"` finds `"ÉTÉ.pdf"`.
pub(crate) fn name_matches(name: &str, fragment: &str) -> bool {
    name.to_lowercase().contains(&fragment.to_lowercase())
}

/// Record a registration whose transfer failed
///
/// An earlier successful upload under the same id is kept: the blob it
/// points at is still readable. Returns whether `record` was saved.
pub async fn record_orphaned(store: &dyn HistoryStore, record: &UploadRecord) -> HistoryResult<bool> {
    if let Some(existing) = store.get(&record.id).await? {
        if existing.status == UploadStatus::Success {
            tracing::warn!(
                id = %record.id,
                kept_transaction = %existing.transaction_hash,
                orphaned_transaction = %record.transaction_hash,
                "Keeping earlier successful upload; orphaned registration not recorded"
            );
            return Ok(false);
        }
    }

    store.save(record).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, status: UploadStatus, transaction_hash: &str) -> UploadRecord {
        UploadRecord {
            id: name.to_string(),
            name: name.to_string(),
            size: 4,
            content_type: guess_content_type(name),
            url: format!("http://localhost/v1/blobs/0xabc/{}", name),
            transaction_hash: transaction_hash.to_string(),
            timestamp: 1,
            expiration_days: 7,
            status,
            test_result: None,
        }
    }

    #[test]
    fn test_name_matches_folds_unicode() {
        assert!(name_matches("ÉTÉ.pdf", "été"));
        assert!(name_matches("Report.PDF", "report"));
        assert!(!name_matches("cat.png", "dog"));
    }

    #[tokio::test]
    async fn test_orphan_does_not_hide_successful_upload() {
        let store = MemoryHistoryStore::new();
        store
            .save(&record("a.txt", UploadStatus::Success, "0xGOOD"))
            .await
            .unwrap();

        let saved = record_orphaned(&store, &record("a.txt", UploadStatus::Error, "0xLOST"))
            .await
            .unwrap();

        assert!(!saved);
        let kept = store.get("a.txt").await.unwrap().unwrap();
        assert_eq!(kept.status, UploadStatus::Success);
        assert_eq!(kept.transaction_hash, "0xGOOD");
    }

    #[tokio::test]
    async fn test_orphan_is_recorded_when_no_success_exists() {
        let store = MemoryHistoryStore::new();
        assert!(record_orphaned(&store, &record("b.txt", UploadStatus::Error, "0xFIRST"))
            .await
            .unwrap());

        // A later orphan replaces an earlier one
        assert!(record_orphaned(&store, &record("b.txt", UploadStatus::Error, "0xSECOND"))
            .await
            .unwrap());
        let stored = store.get("b.txt").await.unwrap().unwrap();
        assert_eq!(stored.status, UploadStatus::Error);
        assert_eq!(stored.transaction_hash, "0xSECOND");
    }
}
