//! SQLite-backed history store

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};

use super::{name_matches, HistoryError, HistoryResult, HistoryStore, UploadRecord, UploadStatus};
use crate::retrieval::RetrievalCheck;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS uploads (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    size INTEGER NOT NULL,
    content_type TEXT NOT NULL,
    url TEXT NOT NULL,
    transaction_hash TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    expiration_days INTEGER NOT NULL,
    status TEXT NOT NULL,
    test_result TEXT
);

CREATE INDEX IF NOT EXISTS idx_uploads_timestamp ON uploads(timestamp DESC);
"#;

const SELECT_COLUMNS: &str = "SELECT id, name, size, content_type, url, transaction_hash, \
     timestamp, expiration_days, status, test_result FROM uploads";

#[derive(Debug, sqlx::FromRow)]
struct UploadRow {
    id: String,
    name: String,
    size: i64,
    content_type: String,
    url: String,
    transaction_hash: String,
    timestamp: i64,
    expiration_days: i64,
    status: String,
    test_result: Option<String>,
}

impl TryFrom<UploadRow> for UploadRecord {
    type Error = HistoryError;

    fn try_from(row: UploadRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| HistoryError::Corrupt {
            id: row.id.clone(),
            reason,
        };

        let status = UploadStatus::parse(&row.status)
            .ok_or_else(|| corrupt(format!("unknown status '{}'", row.status)))?;
        let test_result = row
            .test_result
            .as_deref()
            .map(|raw| serde_json::from_str::<RetrievalCheck>(raw))
            .transpose()
            .map_err(|e| corrupt(format!("bad test result: {}", e)))?;
        let size = u64::try_from(row.size).map_err(|_| corrupt(format!("negative size {}", row.size)))?;
        let expiration_days = u32::try_from(row.expiration_days)
            .map_err(|_| corrupt(format!("bad expiration {}", row.expiration_days)))?;

        Ok(UploadRecord {
            id: row.id,
            name: row.name,
            size,
            content_type: row.content_type,
            url: row.url,
            transaction_hash: row.transaction_hash,
            timestamp: row.timestamp,
            expiration_days,
            status,
            test_result,
        })
    }
}

#[derive(Clone)]
pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    /// Connect with a `sqlite:` URL, creating the database if missing
    pub async fn connect(database_url: &str) -> HistoryResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?;
        Self::with_options(options).await
    }

    /// Open a database file, creating it if missing
    pub async fn open(path: impl AsRef<Path>) -> HistoryResult<Self> {
        let options = SqliteConnectOptions::new().filename(path.as_ref());
        Self::with_options(options).await
    }

    async fn with_options(options: SqliteConnectOptions) -> HistoryResult<Self> {
        let options = options
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query(SCHEMA).execute(&pool).await?;
        tracing::debug!("Upload history schema ready");

        Ok(Self { pool })
    }

    fn encode_test_result(check: Option<&RetrievalCheck>) -> Option<String> {
        check.and_then(|c| serde_json::to_string(c).ok())
    }

    fn into_records(rows: Vec<UploadRow>) -> HistoryResult<Vec<UploadRecord>> {
        rows.into_iter().map(UploadRecord::try_from).collect()
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn save(&self, record: &UploadRecord) -> HistoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO uploads (id, name, size, content_type, url, transaction_hash,
                                 timestamp, expiration_days, status, test_result)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                size = excluded.size,
                content_type = excluded.content_type,
                url = excluded.url,
                transaction_hash = excluded.transaction_hash,
                timestamp = excluded.timestamp,
                expiration_days = excluded.expiration_days,
                status = excluded.status,
                test_result = excluded.test_result
            "#,
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(record.size as i64)
        .bind(&record.content_type)
        .bind(&record.url)
        .bind(&record.transaction_hash)
        .bind(record.timestamp)
        .bind(i64::from(record.expiration_days))
        .bind(record.status.as_str())
        .bind(Self::encode_test_result(record.test_result.as_ref()))
        .execute(&self.pool)
        .await?;

        tracing::debug!(id = %record.id, status = record.status.as_str(), "Saved upload record");
        Ok(())
    }

    async fn list(&self) -> HistoryResult<Vec<UploadRecord>> {
        let rows = sqlx::query_as::<_, UploadRow>(&format!("{} ORDER BY timestamp DESC", SELECT_COLUMNS))
            .fetch_all(&self.pool)
            .await?;
        Self::into_records(rows)
    }

    async fn get(&self, id: &str) -> HistoryResult<Option<UploadRecord>> {
        let row = sqlx::query_as::<_, UploadRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(UploadRecord::try_from).transpose()
    }

    async fn delete(&self, id: &str) -> HistoryResult<bool> {
        let result = sqlx::query("DELETE FROM uploads WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn search(&self, fragment: &str) -> HistoryResult<Vec<UploadRecord>> {
        // SQLite's lower() folds ASCII only, so match in Rust
        let records = self.list().await?;
        Ok(records
            .into_iter()
            .filter(|r| name_matches(&r.name, fragment))
            .collect())
    }

    async fn set_test_result(&self, id: &str, check: RetrievalCheck) -> HistoryResult<UploadRecord> {
        let result = sqlx::query("UPDATE uploads SET test_result = ? WHERE id = ?")
            .bind(Self::encode_test_result(Some(&check)))
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(HistoryError::NotFound(id.to_string()));
        }

        self.get(id)
            .await?
            .ok_or_else(|| HistoryError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, timestamp: i64) -> UploadRecord {
        UploadRecord {
            id: id.to_string(),
            name: id.to_string(),
            size: 2048,
            content_type: "application/pdf".to_string(),
            url: format!("http://localhost/v1/blobs/0xabc/{}", id),
            transaction_hash: format!("0x{}", timestamp),
            timestamp,
            expiration_days: 365,
            status: UploadStatus::Success,
            test_result: None,
        }
    }

    async fn open_store(dir: &tempfile::TempDir) -> SqliteHistoryStore {
        SqliteHistoryStore::open(dir.path().join("history.db")).await.unwrap()
    }

    #[tokio::test]
    async fn test_save_and_list_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;

        store.save(&record("first.pdf", 100)).await.unwrap();
        store.save(&record("second.pdf", 200)).await.unwrap();

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "second.pdf");
        assert_eq!(all[1], record("first.pdf", 100));
    }

    #[tokio::test]
    async fn test_save_upserts() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;

        store.save(&record("a.pdf", 1)).await.unwrap();
        let mut failed = record("a.pdf", 2);
        failed.status = UploadStatus::Error;
        store.save(&failed).await.unwrap();

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, UploadStatus::Error);
    }

    #[tokio::test]
    async fn test_delete_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        store.save(&record("gone.pdf", 1)).await.unwrap();

        assert!(store.get("gone.pdf").await.unwrap().is_some());
        assert!(store.delete("gone.pdf").await.unwrap());
        assert!(store.get("gone.pdf").await.unwrap().is_none());
        assert!(!store.delete("gone.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        store.save(&record("Invoice-2024.pdf", 1)).await.unwrap();
        store.save(&record("holiday.jpg", 2)).await.unwrap();

        let found = store.search("INVOICE").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "Invoice-2024.pdf");
        assert!(store.search("%").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_folds_non_ascii_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        store.save(&record("ÉTÉ.pdf", 1)).await.unwrap();

        let found = store.search("été").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "ÉTÉ.pdf");
    }

    #[tokio::test]
    async fn test_test_result_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let check = RetrievalCheck {
            success: true,
            response_time_ms: 87,
            size: 2048,
        };

        {
            let store = open_store(&dir).await;
            store.save(&record("kept.pdf", 1)).await.unwrap();
            let updated = store.set_test_result("kept.pdf", check).await.unwrap();
            assert_eq!(updated.test_result, Some(check));
            store.pool.close().await;
        }

        let store = open_store(&dir).await;
        let record = store.get("kept.pdf").await.unwrap().unwrap();
        assert_eq!(record.test_result, Some(check));

        let err = store.set_test_result("missing.pdf", check).await.unwrap_err();
        assert!(matches!(err, HistoryError::NotFound(_)));
    }
}
