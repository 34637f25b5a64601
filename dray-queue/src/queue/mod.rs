//! Priority queue with lease-based delivery.
//!
//! Queue items are transient dispatch handles: the durable job state lives
//! in the [`Ledger`](crate::ledger::Ledger). The queue tracks, per job id,
//! a priority, a visibility time, and at most one live lease.

mod memory;

pub use memory::MemoryJobQueue;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::error::QueueResult;
use crate::types::{JobId, LeaseToken, Priority};

/// A leased queue item, held exclusively until `lease_until`.
#[derive(Debug, Clone)]
pub struct LeasedItem {
    pub job_id: JobId,
    pub priority: Priority,
    pub lease_token: LeaseToken,
    pub lease_until: DateTime<Utc>,
}

/// Dispatch queue contract.
///
/// At most one unresolved item exists per job id. `lease` hands out the
/// eligible item with the lowest priority rank, oldest first within a rank.
/// A leased item is invisible to other callers until its lease elapses;
/// after that it becomes leaseable again, which is what makes delivery
/// at-least-once rather than exactly-once.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Adds an item for `job_id`, eligible for dispatch from `visible_at`.
    async fn enqueue(
        &self,
        job_id: JobId,
        priority: Priority,
        visible_at: DateTime<Utc>,
    ) -> QueueResult<()>;

    /// Leases the next eligible item for `lease_for`, or returns `None`
    /// when nothing is currently eligible.
    async fn lease(&self, worker: &str, lease_for: Duration) -> QueueResult<Option<LeasedItem>>;

    /// Resolves a leased item, removing it from the queue. Fails with
    /// `LeaseMismatch` or `LeaseExpired` when the caller no longer holds
    /// the live lease.
    async fn ack(&self, token: &LeaseToken, job_id: &JobId) -> QueueResult<()>;

    /// Releases a leased item. With `retry_at` the item is kept and becomes
    /// eligible again at that time; without it the item is removed for good.
    async fn nack(
        &self,
        token: &LeaseToken,
        job_id: &JobId,
        retry_at: Option<DateTime<Utc>>,
    ) -> QueueResult<()>;
}
