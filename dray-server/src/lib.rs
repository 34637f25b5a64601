//! HTTP job service: accepts submissions over REST, runs them on a
//! dray-queue worker pool, and serves per-job status.

pub mod config;
pub mod http;
pub mod mail;
pub mod processors;
pub mod store;

use std::sync::Arc;

use dray_queue::{
    JobQueue, JobService, Ledger, MemoryJobQueue, MemoryLedger, PoolHandle, ProcessorRegistry,
    RetryPolicy, WorkerConfig, WorkerPool,
};

use config::ServerConfig;
use http::AppState;
use mail::SmtpMailer;
use processors::{CsvExportProcessor, EmailSendProcessor};
use store::FsContentStore;

/// A wired application: the router to serve and the running worker pool.
pub struct App {
    pub router: axum::Router,
    pub pool: PoolHandle,
}

/// Wires the engine, processors, and HTTP API from one configuration.
/// Workers start polling immediately.
pub fn build(config: &ServerConfig) -> anyhow::Result<App> {
    let ledger: Arc<dyn Ledger> = Arc::new(MemoryLedger::new());
    let queue: Arc<dyn JobQueue> = Arc::new(MemoryJobQueue::new());

    let store = Arc::new(FsContentStore::new(config.output_dir.clone()));
    let mailer = Arc::new(SmtpMailer::new(
        &config.mail_host,
        config.mail_port,
        &config.mail_from,
    )?);

    let mut registry = ProcessorRegistry::new();
    registry.register(Arc::new(CsvExportProcessor::new(store)))?;
    registry.register(Arc::new(EmailSendProcessor::new(mailer)))?;

    let worker_config = WorkerConfig {
        workers: config.workers,
        poll_interval: config.poll_interval,
        lease_duration: config.lease_duration,
        retry: RetryPolicy::new(config.max_attempts, config.retry_base_delay),
    };
    let pool = WorkerPool::new(
        ledger.clone(),
        queue.clone(),
        Arc::new(registry),
        worker_config,
    );
    let handle = pool.start();

    let service = Arc::new(JobService::new(ledger, queue));
    let router = http::router(AppState { service });

    Ok(App {
        router,
        pool: handle,
    })
}
