use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{QueueError, QueueResult};
use crate::types::{JobId, JobRecord};

use super::Ledger;

/// In-memory ledger for development and tests
pub struct MemoryLedger {
    records: RwLock<HashMap<JobId, JobRecord>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    fn update<F>(&self, id: &JobId, apply: F) -> QueueResult<()>
    where
        F: FnOnce(&mut JobRecord),
    {
        let mut records = self.records.write();
        let record = records
            .get_mut(id)
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
        apply(record);
        Ok(())
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn create(&self, record: JobRecord) -> QueueResult<()> {
        let mut records = self.records.write();
        if records.contains_key(&record.id) {
            return Err(QueueError::DuplicateItem(record.id.to_string()));
        }
        records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &JobId) -> QueueResult<JobRecord> {
        self.records
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| QueueError::NotFound(id.to_string()))
    }

    async fn mark_processing(&self, id: &JobId, attempt: u32) -> QueueResult<()> {
        self.update(id, |record| record.begin_attempt(attempt))
    }

    async fn mark_completed(&self, id: &JobId, result: Value) -> QueueResult<()> {
        self.update(id, |record| record.complete(result))
    }

    async fn mark_failed(&self, id: &JobId, error: &str) -> QueueResult<()> {
        self.update(id, |record| record.fail(error))
    }

    async fn mark_pending(&self, id: &JobId) -> QueueResult<()> {
        self.update(id, |record| record.requeue())
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}
