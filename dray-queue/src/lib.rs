//! # dray-queue
//!
//! Durable, priority-aware background job engine.
//!
//! Jobs are submitted through a [`JobService`], recorded in a [`Ledger`]
//! keyed by job id, and enqueued on a [`JobQueue`] that dispatches by
//! priority rank (lowest first) and enqueue order within a rank. A
//! [`WorkerPool`] leases items off the queue, runs the matching
//! [`Processor`] from its [`ProcessorRegistry`], and resolves each item:
//! success completes the job, a transient failure retries it under the
//! [`RetryPolicy`]'s exponential backoff, and a permanent failure ends it.
//!
//! Delivery is at-least-once. A worker that dies mid-job simply lets the
//! lease elapse, after which the item is handed to another worker, so
//! processors have to tolerate running more than once for the same job.
//! Lease duration is the knob that bounds how long a crashed job stays
//! stuck before redelivery; keep it above the slowest processor's runtime.
//!
//! The in-memory [`MemoryLedger`] and [`MemoryJobQueue`] back development
//! and tests; both traits are async so persistent stores can slot in
//! without touching the workers.

pub mod error;
pub mod ledger;
pub mod processor;
pub mod queue;
pub mod retry;
pub mod service;
pub mod types;
pub mod worker;

pub use error::{ProcessError, QueueError, QueueResult};
pub use ledger::{Ledger, MemoryLedger};
pub use processor::{Processor, ProcessorRegistry};
pub use queue::{JobQueue, LeasedItem, MemoryJobQueue};
pub use retry::RetryPolicy;
pub use service::{JobService, NewJob};
pub use types::{JobId, JobRecord, JobStatus, LeaseToken, Priority};
pub use worker::{PoolHandle, WorkerConfig, WorkerPool};

/// Commonly used types, one `use` away.
pub mod prelude {
    pub use crate::error::{ProcessError, QueueError, QueueResult};
    pub use crate::ledger::{Ledger, MemoryLedger};
    pub use crate::processor::{Processor, ProcessorRegistry};
    pub use crate::queue::{JobQueue, LeasedItem, MemoryJobQueue};
    pub use crate::retry::RetryPolicy;
    pub use crate::service::{JobService, NewJob};
    pub use crate::types::{JobId, JobRecord, JobStatus, LeaseToken, Priority};
    pub use crate::worker::{PoolHandle, WorkerConfig, WorkerPool};
}
