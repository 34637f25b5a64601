use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{QueueError, QueueResult};
use crate::types::{JobId, LeaseToken, Priority};

use super::{JobQueue, LeasedItem};

#[derive(Debug, Clone)]
struct Lease {
    token: LeaseToken,
    until: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct Item {
    priority: Priority,
    visible_at: DateTime<Utc>,
    seq: u64,
    lease: Option<Lease>,
}

impl Item {
    /// Eligible means visible and not under a live lease. An elapsed lease
    /// does not block re-dispatch.
    fn eligible(&self, now: DateTime<Utc>) -> bool {
        self.visible_at <= now && self.lease.as_ref().map_or(true, |lease| lease.until <= now)
    }
}

/// In-memory job queue for development and tests.
pub struct MemoryJobQueue {
    items: RwLock<HashMap<JobId, Item>>,
    seq: AtomicU64,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            seq: AtomicU64::new(0),
        }
    }

    /// Number of unresolved items, leased ones included.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    fn verify_lease(item: &Item, token: &LeaseToken, now: DateTime<Utc>) -> QueueResult<()> {
        let lease = item.lease.as_ref().ok_or(QueueError::LeaseMismatch)?;
        if lease.token != *token {
            return Err(QueueError::LeaseMismatch);
        }
        if lease.until <= now {
            return Err(QueueError::LeaseExpired);
        }
        Ok(())
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(
        &self,
        job_id: JobId,
        priority: Priority,
        visible_at: DateTime<Utc>,
    ) -> QueueResult<()> {
        let mut items = self.items.write();
        if items.contains_key(&job_id) {
            return Err(QueueError::DuplicateItem(job_id.to_string()));
        }
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        items.insert(
            job_id,
            Item {
                priority,
                visible_at,
                seq,
                lease: None,
            },
        );
        Ok(())
    }

    async fn lease(&self, worker: &str, lease_for: Duration) -> QueueResult<Option<LeasedItem>> {
        let now = Utc::now();
        let lease_for = chrono::Duration::from_std(lease_for)
            .map_err(|e| QueueError::Internal(format!("Lease duration out of range: {e}")))?;

        let mut items = self.items.write();
        let next = items
            .iter()
            .filter(|(_, item)| item.eligible(now))
            .min_by_key(|(_, item)| (item.priority.rank(), item.seq))
            .map(|(job_id, _)| job_id.clone());

        if let Some(job_id) = next {
            if let Some(item) = items.get_mut(&job_id) {
                let token = LeaseToken::new();
                let until = now + lease_for;
                item.lease = Some(Lease {
                    token: token.clone(),
                    until,
                });
                debug!(job_id = %job_id, worker, lease_until = %until, "Leased queue item");
                return Ok(Some(LeasedItem {
                    job_id,
                    priority: item.priority,
                    lease_token: token,
                    lease_until: until,
                }));
            }
        }
        Ok(None)
    }

    async fn ack(&self, token: &LeaseToken, job_id: &JobId) -> QueueResult<()> {
        let now = Utc::now();
        let mut items = self.items.write();
        let item = items
            .get(job_id)
            .ok_or_else(|| QueueError::NotFound(job_id.to_string()))?;
        Self::verify_lease(item, token, now)?;
        items.remove(job_id);
        debug!(job_id = %job_id, "Resolved queue item");
        Ok(())
    }

    async fn nack(
        &self,
        token: &LeaseToken,
        job_id: &JobId,
        retry_at: Option<DateTime<Utc>>,
    ) -> QueueResult<()> {
        let now = Utc::now();
        let mut items = self.items.write();
        let item = items
            .get(job_id)
            .ok_or_else(|| QueueError::NotFound(job_id.to_string()))?;
        Self::verify_lease(item, token, now)?;

        match retry_at {
            Some(at) => {
                if let Some(item) = items.get_mut(job_id) {
                    item.lease = None;
                    item.visible_at = at;
                }
                debug!(job_id = %job_id, retry_at = %at, "Requeued item for retry");
            }
            None => {
                items.remove(job_id);
                debug!(job_id = %job_id, "Removed item without retry");
            }
        }
        Ok(())
    }
}

impl Default for MemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEASE: Duration = Duration::from_secs(30);

    async fn enqueue_now(queue: &MemoryJobQueue, priority: Priority) -> JobId {
        let id = JobId::new();
        queue
            .enqueue(id.clone(), priority, Utc::now())
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn leases_an_enqueued_item() {
        let queue = MemoryJobQueue::new();
        let id = enqueue_now(&queue, Priority::Default).await;

        let item = queue.lease("w1", LEASE).await.unwrap().unwrap();
        assert_eq!(item.job_id, id);
        assert_eq!(item.priority, Priority::Default);
        assert!(item.lease_until > Utc::now());
    }

    #[tokio::test]
    async fn enqueue_rejects_duplicate_job_id() {
        let queue = MemoryJobQueue::new();
        let id = enqueue_now(&queue, Priority::Default).await;

        let result = queue.enqueue(id, Priority::High, Utc::now()).await;
        assert!(matches!(result, Err(QueueError::DuplicateItem(_))));
    }

    #[tokio::test]
    async fn high_priority_leases_before_default() {
        let queue = MemoryJobQueue::new();
        let _default = enqueue_now(&queue, Priority::Default).await;
        let high = enqueue_now(&queue, Priority::High).await;

        let first = queue.lease("w1", LEASE).await.unwrap().unwrap();
        assert_eq!(first.job_id, high);
        assert_eq!(first.priority, Priority::High);
    }

    #[tokio::test]
    async fn same_priority_leases_in_enqueue_order() {
        let queue = MemoryJobQueue::new();
        let first = enqueue_now(&queue, Priority::Default).await;
        let second = enqueue_now(&queue, Priority::Default).await;

        let a = queue.lease("w1", LEASE).await.unwrap().unwrap();
        queue.ack(&a.lease_token, &a.job_id).await.unwrap();
        let b = queue.lease("w1", LEASE).await.unwrap().unwrap();

        assert_eq!(a.job_id, first);
        assert_eq!(b.job_id, second);
    }

    #[tokio::test]
    async fn future_visibility_hides_the_item() {
        let queue = MemoryJobQueue::new();
        let id = JobId::new();
        queue
            .enqueue(id, Priority::High, Utc::now() + chrono::Duration::hours(1))
            .await
            .unwrap();

        assert!(queue.lease("w1", LEASE).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn live_lease_blocks_second_lease() {
        let queue = MemoryJobQueue::new();
        enqueue_now(&queue, Priority::Default).await;

        assert!(queue.lease("w1", LEASE).await.unwrap().is_some());
        assert!(queue.lease("w2", LEASE).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn elapsed_lease_makes_item_leaseable_again() {
        let queue = MemoryJobQueue::new();
        let id = enqueue_now(&queue, Priority::Default).await;

        let stale = queue
            .lease("w1", Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let fresh = queue.lease("w2", LEASE).await.unwrap().unwrap();
        assert_eq!(fresh.job_id, id);

        // The first holder lost the item and can no longer resolve it.
        let result = queue.ack(&stale.lease_token, &id).await;
        assert!(matches!(result, Err(QueueError::LeaseMismatch)));

        queue.ack(&fresh.lease_token, &id).await.unwrap();
    }

    #[tokio::test]
    async fn expired_unreleased_lease_reports_expiry() {
        let queue = MemoryJobQueue::new();
        let id = enqueue_now(&queue, Priority::Default).await;

        let stale = queue
            .lease("w1", Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let result = queue.ack(&stale.lease_token, &id).await;
        assert!(matches!(result, Err(QueueError::LeaseExpired)));
    }

    #[tokio::test]
    async fn ack_with_wrong_token_is_rejected() {
        let queue = MemoryJobQueue::new();
        let id = enqueue_now(&queue, Priority::Default).await;
        queue.lease("w1", LEASE).await.unwrap().unwrap();

        let result = queue.ack(&LeaseToken::new(), &id).await;
        assert!(matches!(result, Err(QueueError::LeaseMismatch)));
    }

    #[tokio::test]
    async fn ack_removes_the_item() {
        let queue = MemoryJobQueue::new();
        let id = enqueue_now(&queue, Priority::Default).await;

        let item = queue.lease("w1", LEASE).await.unwrap().unwrap();
        queue.ack(&item.lease_token, &id).await.unwrap();

        assert!(queue.is_empty());
        assert!(queue.lease("w1", LEASE).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn nack_with_retry_requeues_at_given_time() {
        let queue = MemoryJobQueue::new();
        let id = enqueue_now(&queue, Priority::Default).await;

        let item = queue.lease("w1", LEASE).await.unwrap().unwrap();
        queue
            .nack(&item.lease_token, &id, Some(Utc::now()))
            .await
            .unwrap();

        let again = queue.lease("w2", LEASE).await.unwrap().unwrap();
        assert_eq!(again.job_id, id);
    }

    #[tokio::test]
    async fn nack_with_future_retry_hides_until_then() {
        let queue = MemoryJobQueue::new();
        let id = enqueue_now(&queue, Priority::Default).await;

        let item = queue.lease("w1", LEASE).await.unwrap().unwrap();
        queue
            .nack(
                &item.lease_token,
                &id,
                Some(Utc::now() + chrono::Duration::hours(1)),
            )
            .await
            .unwrap();

        assert_eq!(queue.len(), 1);
        assert!(queue.lease("w2", LEASE).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn nack_without_retry_removes_the_item() {
        let queue = MemoryJobQueue::new();
        let id = enqueue_now(&queue, Priority::Default).await;

        let item = queue.lease("w1", LEASE).await.unwrap().unwrap();
        queue.nack(&item.lease_token, &id, None).await.unwrap();

        assert!(queue.is_empty());
    }
}
