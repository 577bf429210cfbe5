//! Scheduler trait: submit a unit of work, poll its status.

use crate::JobStoreError;
use async_trait::async_trait;
use ml_types::{Job, JobError, JobKind, JobResult};
use std::future::Future;
use std::pin::Pin;

/// The work behind one job. Runs exactly once on a worker.
pub type JobWork = Pin<Box<dyn Future<Output = Result<JobResult, JobError>> + Send + 'static>>;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The bounded queue is full; nothing was recorded.
    #[error("job queue is full")]
    QueueFull,
    /// The worker pool is gone; nothing was recorded.
    #[error("dispatch failed: {0}")]
    Dispatch(String),
    #[error("job store: {0}")]
    Store(#[from] JobStoreError),
}

/// Contract: `get_status` returns `Ok(None)` when the job id is unknown (never created, or
/// evicted by retention). The API layer maps `Ok(None)` to HTTP 404.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Records a `Pending` job and queues `work`; returns the job id without waiting.
    async fn submit(&self, kind: JobKind, work: JobWork) -> Result<String, SchedulerError>;

    async fn get_status(&self, job_id: &str) -> Result<Option<Job>, SchedulerError>;
}
