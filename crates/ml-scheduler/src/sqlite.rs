//! SQLite-backed job table: records survive restarts.

use crate::{JobStore, JobStoreError};
use async_trait::async_trait;
use ml_types::{Job, JobError, JobResult};
use rusqlite::OptionalExtension;
use std::path::Path;

/// One row per job; the full record is kept as JSON next to the columns eviction filters on.
pub struct SqliteJobStore {
    conn: std::sync::Mutex<rusqlite::Connection>,
}

impl SqliteJobStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, JobStoreError> {
        let conn = rusqlite::Connection::open(path)
            .map_err(|e| JobStoreError::Backend(e.to_string()))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                job_id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                finished_at TEXT,
                record TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_finished ON jobs(status, finished_at);
            "#,
        )
        .map_err(|e| JobStoreError::Backend(e.to_string()))?;

        Ok(Self {
            conn: std::sync::Mutex::new(conn),
        })
    }

    fn with_conn<T, F>(&self, f: F) -> Result<T, JobStoreError>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| JobStoreError::Backend(format!("failed to acquire lock: {}", e)))?;
        f(&conn).map_err(|e| JobStoreError::Backend(e.to_string()))
    }

    /// Read-modify-write of one record inside a transaction. `None` if the job does not exist.
    fn update<F>(&self, job_id: &str, apply: F) -> Result<Option<bool>, JobStoreError>
    where
        F: FnOnce(&mut Job) -> bool,
    {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let record: Option<String> = tx
                .query_row(
                    "SELECT record FROM jobs WHERE job_id = ?1",
                    rusqlite::params![job_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(record) = record else {
                return Ok(None);
            };
            let mut job = decode(&record)?;
            let changed = apply(&mut job);
            if changed {
                tx.execute(
                    "UPDATE jobs SET status = ?2, finished_at = ?3, record = ?4 WHERE job_id = ?1",
                    rusqlite::params![job_id, job.status.as_str(), job.finished_at, encode(&job)?],
                )?;
            }
            tx.commit()?;
            Ok(Some(changed))
        })
    }
}

fn encode(job: &Job) -> Result<String, rusqlite::Error> {
    serde_json::to_string(job).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn decode(record: &str) -> Result<Job, rusqlite::Error> {
    serde_json::from_str(record).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn insert(&self, job: Job) -> Result<(), JobStoreError> {
        let inserted = self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO jobs (job_id, kind, status, created_at, finished_at, record) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    job.job_id,
                    job.kind.as_str(),
                    job.status.as_str(),
                    job.created_at,
                    job.finished_at,
                    encode(&job)?,
                ],
            )
        })?;
        if inserted == 0 {
            return Err(JobStoreError::Duplicate(job.job_id));
        }
        Ok(())
    }

    async fn mark_started(&self, job_id: &str, now: &str) -> Result<bool, JobStoreError> {
        self.update(job_id, |job| job.mark_started(now))?
            .ok_or_else(|| JobStoreError::NotFound(job_id.to_string()))
    }

    async fn finish(
        &self,
        job_id: &str,
        outcome: Result<JobResult, JobError>,
        now: &str,
    ) -> Result<bool, JobStoreError> {
        self.update(job_id, |job| job.finish(outcome, now))?
            .ok_or_else(|| JobStoreError::NotFound(job_id.to_string()))
    }

    async fn get(&self, job_id: &str) -> Result<Option<Job>, JobStoreError> {
        self.with_conn(|conn| {
            let record: Option<String> = conn
                .query_row(
                    "SELECT record FROM jobs WHERE job_id = ?1",
                    rusqlite::params![job_id],
                    |row| row.get(0),
                )
                .optional()?;
            record.as_deref().map(decode).transpose()
        })
    }

    async fn evict_finished_before(&self, cutoff: &str) -> Result<usize, JobStoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM jobs WHERE status IN ('Success', 'Failure') AND finished_at < ?1",
                rusqlite::params![cutoff],
            )
        })
    }
}
