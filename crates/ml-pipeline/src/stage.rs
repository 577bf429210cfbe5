//! Stage contract and pipeline errors.

use crate::config::RunContext;
use async_trait::async_trait;
use ml_types::{JobError, JobErrorKind, ModelError, StoreError};

/// One unit of pipeline work: a typed artifact (or artifact tuple) in, a typed artifact out.
/// Side effects are limited to the artifact store.
#[async_trait]
pub trait Stage<I: Sync>: Send + Sync {
    type Output: Send;

    /// Name used in logs and failure reports.
    fn name(&self) -> &'static str;

    async fn run(&self, input: &I, ctx: &RunContext) -> Result<Self::Output, StageError>;
}

/// Boxed stage taking `I` and producing `O`.
pub type BoxStage<I, O> = Box<dyn Stage<I, Output = O>>;

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("model: {0}")]
    Model(#[from] ModelError),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("{0}")]
    Other(String),
}

impl StageError {
    /// Kind recorded on a failed job.
    pub fn job_error_kind(&self) -> JobErrorKind {
        match self {
            StageError::Store(StoreError::Unavailable(_)) => JobErrorKind::StoreUnavailable,
            _ => JobErrorKind::StageFailure,
        }
    }
}

/// A training run that failed. Gate short-circuits are outcomes, not errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("stage {stage} failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: StageError,
    },
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Stage { stage, .. } => stage,
        }
    }

    pub fn to_job_error(&self) -> JobError {
        match self {
            PipelineError::Stage { source, .. } => {
                JobError::new(source.job_error_kind(), self.to_string())
            }
        }
    }
}
