//! Job records: lifecycle state of one asynchronous training or inference invocation.

use crate::{Prediction, TrainingOutcome};
use serde::{Deserialize, Serialize};

/// What a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Training,
    Inference,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Training => "training",
            JobKind::Inference => "inference",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "training" => Some(JobKind::Training),
            "inference" => Some(JobKind::Inference),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job lifecycle: `Pending -> Started -> {Success, Failure}`.
///
/// Serialized names are the ones reported by the status endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Started,
    Success,
    Failure,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::Started => "Started",
            JobStatus::Success => "Success",
            JobStatus::Failure => "Failure",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(JobStatus::Pending),
            "Started" => Some(JobStatus::Started),
            "Success" => Some(JobStatus::Success),
            "Failure" => Some(JobStatus::Failure),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failure)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Success payload, shaped per job kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum JobResult {
    Training(TrainingOutcome),
    Inference(Prediction),
}

impl JobResult {
    pub fn kind(&self) -> JobKind {
        match self {
            JobResult::Training(_) => JobKind::Training,
            JobResult::Inference(_) => JobKind::Inference,
        }
    }
}

/// Category of a captured job failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobErrorKind {
    /// A pipeline stage or the inference step returned an error.
    StageFailure,
    /// The artifact store could not serve a required operation.
    StoreUnavailable,
    /// The work panicked or was torn down before returning.
    Aborted,
}

/// Failure payload recorded on the job (kind + verbatim message).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobError {
    pub kind: JobErrorKind,
    pub message: String,
}

impl JobError {
    pub fn new(kind: JobErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Tracked state of one asynchronous invocation. Timestamps are RFC 3339.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

impl Job {
    pub fn pending(job_id: impl Into<String>, kind: JobKind, now: &str) -> Self {
        Self {
            job_id: job_id.into(),
            kind,
            status: JobStatus::Pending,
            created_at: now.to_string(),
            updated_at: now.to_string(),
            started_at: None,
            finished_at: None,
            result: None,
            error: None,
        }
    }

    /// `Pending -> Started`. Returns false (and leaves the job untouched) from any other state.
    pub fn mark_started(&mut self, now: &str) -> bool {
        if self.status != JobStatus::Pending {
            return false;
        }
        self.status = JobStatus::Started;
        self.started_at = Some(now.to_string());
        self.updated_at = now.to_string();
        true
    }

    /// Moves to `Success` or `Failure`. Terminal states are final: returns false if already
    /// terminal.
    pub fn finish(&mut self, outcome: Result<JobResult, JobError>, now: &str) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        match outcome {
            Ok(result) => {
                self.status = JobStatus::Success;
                self.result = Some(result);
            }
            Err(error) => {
                self.status = JobStatus::Failure;
                self.error = Some(error);
            }
        }
        self.finished_at = Some(now.to_string());
        self.updated_at = now.to_string();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction() -> JobResult {
        JobResult::Inference(Prediction {
            label: "Sports".to_string(),
            confidence: 0.8,
        })
    }

    #[test]
    fn lifecycle_moves_forward_only() {
        let mut job = Job::pending("j1", JobKind::Inference, "t0");
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.mark_started("t1"));
        assert!(!job.mark_started("t2"));
        assert_eq!(job.started_at.as_deref(), Some("t1"));

        assert!(job.finish(Ok(prediction()), "t3"));
        assert_eq!(job.status, JobStatus::Success);
        assert!(job.error.is_none());

        let failed = JobError::new(JobErrorKind::StageFailure, "late");
        assert!(!job.finish(Err(failed), "t4"));
        assert_eq!(job.status, JobStatus::Success);
        assert_eq!(job.result, Some(prediction()));
        assert_eq!(job.finished_at.as_deref(), Some("t3"));
        assert!(!job.mark_started("t5"));
    }

    #[test]
    fn failure_carries_error_only() {
        let mut job = Job::pending("j2", JobKind::Training, "t0");
        assert!(job.finish(
            Err(JobError::new(JobErrorKind::StoreUnavailable, "bucket gone")),
            "t1"
        ));
        assert_eq!(job.status, JobStatus::Failure);
        assert!(job.result.is_none());
        assert_eq!(job.error.as_ref().unwrap().message, "bucket gone");
    }

    #[test]
    fn result_is_tagged_by_kind() {
        let v = serde_json::to_value(prediction()).unwrap();
        assert_eq!(v["kind"], "inference");
        assert_eq!(v["data"]["label"], "Sports");
        assert_eq!(prediction().kind(), JobKind::Inference);
        assert_eq!(serde_json::to_value(JobStatus::Started).unwrap(), "Started");
    }
}
