pub mod memory;

pub use memory::MemoryLedger;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::QueueResult;
use crate::types::{JobId, JobRecord};

/// Durable key-value store of job records.
///
/// Writes are last-write-wins per job id. Only the worker holding the
/// live lease for a job writes to its record, so no cross-worker write
/// races occur by construction.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Insert a new record. Fails with `DuplicateItem` if the id exists.
    async fn create(&self, record: JobRecord) -> QueueResult<()>;

    /// Fetch a record by id
    async fn get(&self, id: &JobId) -> QueueResult<JobRecord>;

    /// Transition to `processing`, recording the attempt number
    async fn mark_processing(&self, id: &JobId, attempt: u32) -> QueueResult<()>;

    /// Transition to `completed` with the processor result
    async fn mark_completed(&self, id: &JobId, result: Value) -> QueueResult<()>;

    /// Transition to `failed` with a permanent error message
    async fn mark_failed(&self, id: &JobId, error: &str) -> QueueResult<()>;

    /// Transition back to `pending` ahead of a retry
    async fn mark_pending(&self, id: &JobId) -> QueueResult<()>;
}
