use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{ProcessError, QueueError, QueueResult};
use crate::types::JobId;

use super::Processor;

/// Maps job type strings to their processors.
///
/// The registry is populated once at startup and shared read-only with the
/// worker pool afterwards.
#[derive(Default)]
pub struct ProcessorRegistry {
    processors: HashMap<&'static str, Arc<dyn Processor>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a processor under its job type. Each type takes exactly
    /// one processor.
    pub fn register(&mut self, processor: Arc<dyn Processor>) -> QueueResult<()> {
        let job_type = processor.job_type();
        if self.processors.contains_key(job_type) {
            return Err(QueueError::Internal(format!(
                "Processor already registered for '{job_type}'"
            )));
        }
        self.processors.insert(job_type, processor);
        Ok(())
    }

    /// Dispatches one attempt to the processor for `job_type`. A type with
    /// no processor fails permanently.
    pub async fn process(
        &self,
        job_type: &str,
        job_id: &JobId,
        payload: &Value,
    ) -> Result<Value, ProcessError> {
        let processor = self
            .processors
            .get(job_type)
            .ok_or_else(|| ProcessError::UnknownType(job_type.to_string()))?;
        processor.process(job_id, payload).await
    }

    pub fn is_registered(&self, job_type: &str) -> bool {
        self.processors.contains_key(job_type)
    }

    pub fn registered_types(&self) -> Vec<&'static str> {
        self.processors.keys().copied().collect()
    }
}
