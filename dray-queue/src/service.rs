use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::info;

use crate::error::{QueueError, QueueResult};
use crate::ledger::Ledger;
use crate::queue::JobQueue;
use crate::types::{JobId, JobRecord, Priority};

/// A job submission before it has an id.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub job_type: String,
    pub priority: Priority,
    pub payload: Value,
}

impl NewJob {
    pub fn new(job_type: impl Into<String>, priority: Priority, payload: Value) -> Self {
        Self {
            job_type: job_type.into(),
            priority,
            payload,
        }
    }
}

/// Front door for submitting jobs and reading their status.
pub struct JobService {
    ledger: Arc<dyn Ledger>,
    queue: Arc<dyn JobQueue>,
}

impl JobService {
    pub fn new(ledger: Arc<dyn Ledger>, queue: Arc<dyn JobQueue>) -> Self {
        Self { ledger, queue }
    }

    /// Validates the submission, records it as pending, and enqueues it
    /// for immediate dispatch.
    pub async fn submit(&self, job: NewJob) -> QueueResult<JobId> {
        if job.job_type.trim().is_empty() || job.payload.is_null() {
            return Err(QueueError::InvalidRequest(
                "Type and payload are required".to_string(),
            ));
        }

        let id = JobId::new();
        let record = JobRecord::new(id.clone(), &job.job_type, job.priority, job.payload);
        self.ledger.create(record).await?;
        self.queue
            .enqueue(id.clone(), job.priority, Utc::now())
            .await?;

        info!(job_id = %id, job_type = %job.job_type, priority = %job.priority, "Job submitted");
        Ok(id)
    }

    /// Current ledger record for a job.
    pub async fn status(&self, id: &JobId) -> QueueResult<JobRecord> {
        self.ledger.get(id).await
    }
}
