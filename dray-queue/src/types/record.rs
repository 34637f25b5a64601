use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{JobId, Priority};

/// Job status lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Job is waiting in the queue, either for its first run or a retry
    Pending,

    /// A worker holds the lease and is running the processor
    Processing,

    /// Job finished successfully with a result
    Completed,

    /// Job finished permanently with an error
    Failed,
}

impl JobStatus {
    /// Check if the job reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Get the status name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Ledger entry for a single job. The ledger is the source of truth for
/// job existence and terminal outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique job identifier
    pub id: JobId,

    /// Type tag selecting the processor
    pub job_type: String,

    /// Dispatch priority class
    pub priority: Priority,

    /// Current lifecycle status
    pub status: JobStatus,

    /// Processing attempts started so far, monotonically non-decreasing
    pub attempts: u32,

    /// Submission payload, immutable after creation
    pub payload: Value,

    /// Processor result, set once on success
    pub result: Option<Value>,

    /// Error message, set on terminal failure
    pub error: Option<String>,

    /// When the job was submitted
    pub created_at: DateTime<Utc>,

    /// When the record last changed
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Create a new record in `pending` state with zero attempts
    pub fn new(
        id: JobId,
        job_type: impl Into<String>,
        priority: Priority,
        payload: Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            job_type: job_type.into(),
            priority,
            status: JobStatus::Pending,
            attempts: 0,
            payload,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record the start of a processing attempt
    pub fn begin_attempt(&mut self, attempt: u32) {
        self.status = JobStatus::Processing;
        self.attempts = attempt;
        self.touch();
    }

    /// Complete the job with a result. Result and error stay mutually
    /// exclusive.
    pub fn complete(&mut self, result: Value) {
        self.status = JobStatus::Completed;
        self.result = Some(result);
        self.error = None;
        self.touch();
    }

    /// Fail the job permanently with an error message
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.result = None;
        self.touch();
    }

    /// Put the job back in line for another attempt, keeping the attempt
    /// count. The failure that caused the retry is logged, not persisted.
    pub fn requeue(&mut self) {
        self.status = JobStatus::Pending;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
