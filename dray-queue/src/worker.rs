use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::{QueueError, QueueResult};
use crate::ledger::Ledger;
use crate::processor::ProcessorRegistry;
use crate::queue::{JobQueue, LeasedItem};
use crate::retry::RetryPolicy;

/// Worker pool tuning.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of concurrent workers.
    pub workers: usize,
    /// Sleep between polls when the queue is empty.
    pub poll_interval: Duration,
    /// How long a leased job stays invisible to other workers.
    /// Must exceed the worst-case processor runtime, or a slow job will
    /// be redelivered while still running.
    pub lease_duration: Duration,
    pub retry: RetryPolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            poll_interval: Duration::from_millis(100),
            lease_duration: Duration::from_secs(300),
            retry: RetryPolicy::default(),
        }
    }
}

/// Pulls jobs from the queue and runs them through the registry.
///
/// Each worker resolves the queue item first and writes the ledger second,
/// so a crash between the two leaves a resolved queue entry and a stale
/// ledger row rather than a phantom redelivery.
pub struct WorkerPool {
    ledger: Arc<dyn Ledger>,
    queue: Arc<dyn JobQueue>,
    registry: Arc<ProcessorRegistry>,
    config: WorkerConfig,
    processed: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl WorkerPool {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        queue: Arc<dyn JobQueue>,
        registry: Arc<ProcessorRegistry>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            ledger,
            queue,
            registry,
            config,
            processed: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Jobs completed successfully since the pool was created.
    pub fn jobs_processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Jobs that failed permanently since the pool was created.
    pub fn jobs_failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Spawns the configured number of workers and returns a handle for
    /// draining them.
    pub fn start(&self) -> PoolHandle {
        let (shutdown_tx, _) = broadcast::channel(1);
        let mut handles = Vec::with_capacity(self.config.workers);

        for index in 0..self.config.workers {
            let worker = Worker {
                name: format!("worker-{index}"),
                ledger: Arc::clone(&self.ledger),
                queue: Arc::clone(&self.queue),
                registry: Arc::clone(&self.registry),
                config: self.config.clone(),
                processed: Arc::clone(&self.processed),
                failed: Arc::clone(&self.failed),
            };
            let shutdown_rx = shutdown_tx.subscribe();
            handles.push(tokio::spawn(worker.run(shutdown_rx)));
        }

        info!(workers = self.config.workers, "Worker pool started");
        PoolHandle {
            shutdown_tx,
            handles,
        }
    }
}

/// Handle to a running pool. Dropping it does not stop the workers; call
/// [`PoolHandle::shutdown`] to drain them.
pub struct PoolHandle {
    shutdown_tx: broadcast::Sender<()>,
    handles: Vec<JoinHandle<()>>,
}

impl PoolHandle {
    /// Signals every worker to stop and waits for the tasks to exit. An
    /// in-flight job is abandoned at its next await point; its lease
    /// elapses and the job is redelivered on the next run.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Worker task failed to join");
            }
        }
        info!("Worker pool stopped");
    }
}

struct Worker {
    name: String,
    ledger: Arc<dyn Ledger>,
    queue: Arc<dyn JobQueue>,
    registry: Arc<ProcessorRegistry>,
    config: WorkerConfig,
    processed: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl Worker {
    async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(worker = %self.name, "Worker started");
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                result = self.process_next() => match result {
                    Ok(true) => {}
                    Ok(false) => tokio::time::sleep(self.config.poll_interval).await,
                    Err(e) => {
                        error!(worker = %self.name, error = %e, "Worker loop error");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                },
            }
        }
        info!(worker = %self.name, "Worker stopped");
    }

    /// Runs one job if one is eligible. `Ok(false)` means the queue had
    /// nothing for us and the caller should back off.
    async fn process_next(&self) -> QueueResult<bool> {
        let Some(item) = self
            .queue
            .lease(&self.name, self.config.lease_duration)
            .await?
        else {
            return Ok(false);
        };

        let record = match self.ledger.get(&item.job_id).await {
            Ok(record) => record,
            Err(QueueError::NotFound(_)) => {
                warn!(worker = %self.name, job_id = %item.job_id, "Leased item has no ledger record, dropping");
                let _ = self.try_resolve(
                    self.queue.ack(&item.lease_token, &item.job_id).await,
                    &item,
                )?;
                return Ok(true);
            }
            Err(e) => return Err(e),
        };

        let attempt = record.attempts + 1;
        if attempt > self.config.retry.max_attempts {
            // A redelivered item whose record already burned the budget
            // (the final attempt crashed past mark_processing) fails
            // without another run.
            if self.try_resolve(
                self.queue.ack(&item.lease_token, &item.job_id).await,
                &item,
            )? {
                self.ledger
                    .mark_failed(&item.job_id, "Attempt budget exhausted")
                    .await?;
                self.failed.fetch_add(1, Ordering::Relaxed);
                warn!(worker = %self.name, job_id = %item.job_id, "Failed job with exhausted attempt budget");
            }
            return Ok(true);
        }

        self.ledger.mark_processing(&item.job_id, attempt).await?;
        info!(
            worker = %self.name,
            job_id = %item.job_id,
            job_type = %record.job_type,
            attempt,
            "Processing job"
        );

        let outcome = self
            .registry
            .process(&record.job_type, &item.job_id, &record.payload)
            .await;

        match outcome {
            Ok(result) => {
                if self.try_resolve(
                    self.queue.ack(&item.lease_token, &item.job_id).await,
                    &item,
                )? {
                    self.ledger.mark_completed(&item.job_id, result).await?;
                    self.processed.fetch_add(1, Ordering::Relaxed);
                    info!(worker = %self.name, job_id = %item.job_id, attempt, "Job completed");
                }
            }
            Err(err) if err.is_retryable() => {
                match self.config.retry.next_retry_at(attempt, Utc::now()) {
                    Some(retry_at) => {
                        if self.try_resolve(
                            self.queue
                                .nack(&item.lease_token, &item.job_id, Some(retry_at))
                                .await,
                            &item,
                        )? {
                            self.ledger.mark_pending(&item.job_id).await?;
                            warn!(
                                worker = %self.name,
                                job_id = %item.job_id,
                                attempt,
                                retry_at = %retry_at,
                                error = %err,
                                "Job failed, will retry"
                            );
                        }
                    }
                    None => {
                        if self.try_resolve(
                            self.queue.nack(&item.lease_token, &item.job_id, None).await,
                            &item,
                        )? {
                            self.ledger
                                .mark_failed(&item.job_id, &err.to_string())
                                .await?;
                            self.failed.fetch_add(1, Ordering::Relaxed);
                            error!(
                                worker = %self.name,
                                job_id = %item.job_id,
                                attempt,
                                error = %err,
                                "Job failed permanently"
                            );
                        }
                    }
                }
            }
            Err(err) => {
                if self.try_resolve(
                    self.queue.ack(&item.lease_token, &item.job_id).await,
                    &item,
                )? {
                    self.ledger
                        .mark_failed(&item.job_id, &err.to_string())
                        .await?;
                    self.failed.fetch_add(1, Ordering::Relaxed);
                    error!(
                        worker = %self.name,
                        job_id = %item.job_id,
                        attempt,
                        error = %err,
                        "Job failed permanently"
                    );
                }
            }
        }

        Ok(true)
    }

    /// `Ok(true)` means this worker still owned the lease and the ledger
    /// write may proceed. A lost lease yields `Ok(false)`: the outcome is
    /// discarded and the item's next holder reruns the job.
    fn try_resolve(&self, result: QueueResult<()>, item: &LeasedItem) -> QueueResult<bool> {
        match result {
            Ok(()) => Ok(true),
            Err(QueueError::LeaseMismatch | QueueError::LeaseExpired | QueueError::NotFound(_)) => {
                warn!(worker = %self.name, job_id = %item.job_id, "Lease lost before resolution, discarding outcome");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
