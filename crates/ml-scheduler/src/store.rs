//! Job table: atomic create / update-by-id of job records.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use ml_types::{Job, JobError, JobResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(String),
    #[error("job already exists: {0}")]
    Duplicate(String),
    #[error("job store backend: {0}")]
    Backend(String),
}

/// Fixed-width RFC 3339 (UTC, microseconds), so stored timestamps order lexicographically.
pub fn now_rfc3339() -> String {
    format_timestamp(Utc::now())
}

pub(crate) fn format_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Storage for job records. Every transition goes through [`Job::mark_started`] or
/// [`Job::finish`], so the state machine is enforced the same way by every backend.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert(&self, job: Job) -> Result<(), JobStoreError>;

    /// `Pending -> Started`. `Ok(false)` if the job is not pending.
    async fn mark_started(&self, job_id: &str, now: &str) -> Result<bool, JobStoreError>;

    /// Terminal transition. `Ok(false)` if the job is already terminal.
    async fn finish(
        &self,
        job_id: &str,
        outcome: Result<JobResult, JobError>,
        now: &str,
    ) -> Result<bool, JobStoreError>;

    async fn get(&self, job_id: &str) -> Result<Option<Job>, JobStoreError>;

    /// Drops terminal jobs that finished strictly before `cutoff`; returns how many.
    async fn evict_finished_before(&self, cutoff: &str) -> Result<usize, JobStoreError>;
}

/// Job records in a shared map.
#[derive(Clone, Default)]
pub struct InMemoryJobStore {
    jobs: Arc<RwLock<HashMap<String, Job>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: Job) -> Result<(), JobStoreError> {
        let mut guard = self.jobs.write().await;
        if guard.contains_key(&job.job_id) {
            return Err(JobStoreError::Duplicate(job.job_id));
        }
        guard.insert(job.job_id.clone(), job);
        Ok(())
    }

    async fn mark_started(&self, job_id: &str, now: &str) -> Result<bool, JobStoreError> {
        let mut guard = self.jobs.write().await;
        let job = guard
            .get_mut(job_id)
            .ok_or_else(|| JobStoreError::NotFound(job_id.to_string()))?;
        Ok(job.mark_started(now))
    }

    async fn finish(
        &self,
        job_id: &str,
        outcome: Result<JobResult, JobError>,
        now: &str,
    ) -> Result<bool, JobStoreError> {
        let mut guard = self.jobs.write().await;
        let job = guard
            .get_mut(job_id)
            .ok_or_else(|| JobStoreError::NotFound(job_id.to_string()))?;
        Ok(job.finish(outcome, now))
    }

    async fn get(&self, job_id: &str) -> Result<Option<Job>, JobStoreError> {
        Ok(self.jobs.read().await.get(job_id).cloned())
    }

    async fn evict_finished_before(&self, cutoff: &str) -> Result<usize, JobStoreError> {
        let mut guard = self.jobs.write().await;
        let before = guard.len();
        guard.retain(|_, job| match (&job.finished_at, job.status.is_terminal()) {
            (Some(finished), true) => finished.as_str() >= cutoff,
            _ => true,
        });
        Ok(before - guard.len())
    }
}
