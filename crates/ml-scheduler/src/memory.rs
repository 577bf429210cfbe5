//! In-memory scheduler: bounded queue + fixed worker pool, job state in a [`JobStore`].

use crate::store::format_timestamp;
use crate::{now_rfc3339, InMemoryJobStore, JobStore, JobWork, Scheduler, SchedulerError};
use async_trait::async_trait;
use chrono::Utc;
use ml_types::{Job, JobError, JobErrorKind, JobKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinError;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    /// Terminal jobs older than this are dropped on the next submission. `None` keeps them.
    pub retention: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 64,
            retention: None,
        }
    }
}

impl SchedulerConfig {
    /// Defaults overridden by `MLOPS_WORKERS`, `MLOPS_QUEUE_CAPACITY`, `MLOPS_JOB_RETENTION_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let number = |k: &str| lookup(k).and_then(|v| v.trim().parse::<u64>().ok());
        if let Some(n) = number("MLOPS_WORKERS").filter(|n| *n > 0) {
            cfg.workers = n as usize;
        }
        if let Some(n) = number("MLOPS_QUEUE_CAPACITY").filter(|n| *n > 0) {
            cfg.queue_capacity = n as usize;
        }
        if let Some(secs) = number("MLOPS_JOB_RETENTION_SECS") {
            cfg.retention = Some(Duration::from_secs(secs));
        }
        cfg
    }
}

type QueuedJob = (String, JobWork);

/// Queues submitted work for a fixed pool of workers; every worker updates job status in the
/// shared store.
pub struct InMemoryScheduler {
    store: Arc<dyn JobStore>,
    tx: mpsc::Sender<QueuedJob>,
    retention: Option<Duration>,
}

impl InMemoryScheduler {
    /// Scheduler with an in-memory job table. Must be called inside a tokio runtime.
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_store(Arc::new(InMemoryJobStore::new()), config)
    }

    /// Create scheduler and spawn `config.workers` workers over `store`.
    pub fn with_store(store: Arc<dyn JobStore>, config: SchedulerConfig) -> Self {
        let (tx, rx) = mpsc::channel::<QueuedJob>(config.queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        for worker in 0..config.workers.max(1) {
            let rx = Arc::clone(&rx);
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                loop {
                    let next = rx.lock().await.recv().await;
                    let Some((job_id, work)) = next else {
                        break;
                    };
                    run_job(store.as_ref(), worker, job_id, work).await;
                }
                tracing::debug!(worker, "job queue closed, worker exiting");
            });
        }

        Self {
            store,
            tx,
            retention: config.retention,
        }
    }

    async fn evict_expired(&self) {
        let Some(retention) = self.retention else {
            return;
        };
        let Ok(age) = chrono::Duration::from_std(retention) else {
            return;
        };
        let Some(cutoff) = Utc::now().checked_sub_signed(age) else {
            return;
        };
        match self
            .store
            .evict_finished_before(&format_timestamp(cutoff))
            .await
        {
            Ok(0) => {}
            Ok(n) => tracing::debug!(evicted = n, "evicted finished jobs past retention"),
            Err(e) => tracing::warn!(error = %e, "job eviction failed"),
        }
    }
}

/// Runs one job: `Started` before the work, terminal state after it returns. A panic inside the
/// work is caught by running it on its own task and recorded as `Aborted`.
async fn run_job(store: &dyn JobStore, worker: usize, job_id: String, work: JobWork) {
    match store.mark_started(&job_id, &now_rfc3339()).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(job_id = %job_id, "job is not pending, skipping");
            return;
        }
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "failed to mark job started");
            let err = JobError::new(JobErrorKind::Aborted, format!("job could not start: {}", e));
            if let Err(e) = store.finish(&job_id, Err(err), &now_rfc3339()).await {
                tracing::error!(job_id = %job_id, error = %e, "failed to record job failure");
            }
            return;
        }
    }
    tracing::info!(job_id = %job_id, worker, "job started");

    let outcome = match tokio::spawn(work).await {
        Ok(outcome) => outcome,
        Err(e) => Err(JobError::new(JobErrorKind::Aborted, abort_message(e))),
    };
    match &outcome {
        Ok(_) => tracing::info!(job_id = %job_id, "job succeeded"),
        Err(e) => tracing::warn!(job_id = %job_id, kind = ?e.kind, error = %e.message, "job failed"),
    }
    match store.finish(&job_id, outcome, &now_rfc3339()).await {
        Ok(true) => {}
        Ok(false) => tracing::warn!(job_id = %job_id, "job was already terminal"),
        Err(e) => tracing::error!(job_id = %job_id, error = %e, "failed to record job result"),
    }
}

fn abort_message(err: JoinError) -> String {
    if !err.is_panic() {
        return "job was cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("job panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("job panicked: {}", s)
    } else {
        "job panicked".to_string()
    }
}

#[async_trait]
impl Scheduler for InMemoryScheduler {
    async fn submit(&self, kind: JobKind, work: JobWork) -> Result<String, SchedulerError> {
        self.evict_expired().await;

        // Queue slot first: a rejected submission never reaches the job table.
        let permit = self.tx.try_reserve().map_err(|e| {
            let err = match e {
                mpsc::error::TrySendError::Full(()) => SchedulerError::QueueFull,
                mpsc::error::TrySendError::Closed(()) => {
                    SchedulerError::Dispatch("worker pool is shut down".to_string())
                }
            };
            tracing::warn!(kind = %kind, error = %err, "job submission rejected");
            err
        })?;

        let job_id = Uuid::new_v4().to_string();
        self.store
            .insert(Job::pending(job_id.clone(), kind, &now_rfc3339()))
            .await?;
        permit.send((job_id.clone(), work));
        tracing::info!(job_id = %job_id, kind = %kind, "job submitted");
        Ok(job_id)
    }

    async fn get_status(&self, job_id: &str) -> Result<Option<Job>, SchedulerError> {
        Ok(self.store.get(job_id).await?)
    }
}
