//! Request and response DTOs for the job HTTP surface.

use crate::{Job, JobError, JobResult, JobStatus};
use serde::{Deserialize, Serialize};

/// Body of `POST /predict`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub text: String,
}

impl PredictRequest {
    /// Trimmed text, or `None` when only whitespace was sent.
    pub fn trimmed_text(&self) -> Option<&str> {
        let t = self.text.trim();
        if t.is_empty() {
            None
        } else {
            Some(t)
        }
    }
}

/// Returned immediately on submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub job_id: String,
    pub message: String,
}

/// Poll response for `/train-status/{id}` and `/predict-status/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub job_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

impl From<Job> for StatusResponse {
    fn from(job: Job) -> Self {
        let message = match (&job.status, &job.result) {
            (JobStatus::Pending, _) => Some("Task is still in the queue.".to_string()),
            (JobStatus::Started, _) => Some("Task is running.".to_string()),
            (JobStatus::Success, Some(JobResult::Training(outcome))) => {
                Some(outcome.summary().to_string())
            }
            _ => None,
        };
        Self {
            job_id: job.job_id,
            status: job.status.as_str().to_string(),
            message,
            result: job.result,
            error: job.error,
        }
    }
}

/// Error envelope for non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JobKind;

    #[test]
    fn whitespace_text_is_rejected() {
        let req = PredictRequest {
            text: "  \n\t".to_string(),
        };
        assert!(req.trimmed_text().is_none());
        let req = PredictRequest {
            text: "  markets rally ".to_string(),
        };
        assert_eq!(req.trimmed_text(), Some("markets rally"));
    }

    #[test]
    fn pending_status_uses_camel_case() {
        let job = Job::pending("abc", JobKind::Training, "t0");
        let v = serde_json::to_value(StatusResponse::from(job)).unwrap();
        assert_eq!(v["jobId"], "abc");
        assert_eq!(v["status"], "Pending");
        assert!(v.get("result").is_none());
        assert!(v.get("error").is_none());
    }
}
