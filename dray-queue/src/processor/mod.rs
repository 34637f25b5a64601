//! Job processors and the registry that dispatches to them.

mod registry;

pub use registry::ProcessorRegistry;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ProcessError;
use crate::types::JobId;

/// Handler for one job type.
///
/// Processors receive the payload and return a result value; they never
/// touch the ledger or the queue. Delivery is at-least-once, so a processor
/// may run more than once for the same job and its side effects should be
/// written with that in mind.
#[async_trait]
pub trait Processor: Send + Sync {
    /// The job type string this processor handles.
    fn job_type(&self) -> &'static str;

    /// Runs one attempt. `Ok` completes the job; `Err` fails the attempt,
    /// with [`ProcessError::is_retryable`] deciding whether it retries.
    async fn process(&self, job_id: &JobId, payload: &Value) -> Result<Value, ProcessError>;
}
