//! In-memory history store

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{name_matches, HistoryError, HistoryResult, HistoryStore, UploadRecord};
use crate::retrieval::RetrievalCheck;

#[derive(Default)]
pub struct MemoryHistoryStore {
    records: RwLock<Vec<UploadRecord>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(mut records: Vec<UploadRecord>) -> Vec<UploadRecord> {
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn save(&self, record: &UploadRecord) -> HistoryResult<()> {
        let mut records = self.records.write();
        records.retain(|r| r.id != record.id);
        records.push(record.clone());
        Ok(())
    }

    async fn list(&self) -> HistoryResult<Vec<UploadRecord>> {
        Ok(Self::sorted(self.records.read().clone()))
    }

    async fn get(&self, id: &str) -> HistoryResult<Option<UploadRecord>> {
        Ok(self.records.read().iter().find(|r| r.id == id).cloned())
    }

    async fn delete(&self, id: &str) -> HistoryResult<bool> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }

    async fn search(&self, fragment: &str) -> HistoryResult<Vec<UploadRecord>> {
        let matches = self
            .records
            .read()
            .iter()
            .filter(|r| name_matches(&r.name, fragment))
            .cloned()
            .collect();
        Ok(Self::sorted(matches))
    }

    async fn set_test_result(&self, id: &str, check: RetrievalCheck) -> HistoryResult<UploadRecord> {
        let mut records = self.records.write();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| HistoryError::NotFound(id.to_string()))?;
        record.test_result = Some(check);
        Ok(record.clone())
    }
}
