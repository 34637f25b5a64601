use thiserror::Error;

/// Result type for engine operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Infrastructure errors from the ledger and the queue
#[derive(Error, Debug, Clone)]
pub enum QueueError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Duplicate entry for job: {0}")]
    DuplicateItem(String),

    #[error("Lease not held by caller")]
    LeaseMismatch,

    #[error("Lease has expired")]
    LeaseExpired,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Processor outcome errors - determine retry behavior
#[derive(Error, Debug, Clone)]
pub enum ProcessError {
    /// Payload violates the processor's input contract - never retried
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// No processor registered for the type tag - never retried
    #[error("Unknown job type: {0}")]
    UnknownType(String),

    /// Anything else - retried while attempts remain
    #[error("Transient failure: {0}")]
    Transient(String),
}

impl ProcessError {
    /// Create a permanent payload error
    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self::InvalidPayload(msg.into())
    }

    /// Create a retryable error
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
