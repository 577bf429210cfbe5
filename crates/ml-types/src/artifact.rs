//! Pipeline artifacts: immutable records that reference payloads by object key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named quality scores (e.g. accuracy, f1). Ordered so serialized reports are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricScores(BTreeMap<String, f64>);

impl MetricScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero-valued sentinel over the given metric names; stands in for a missing champion.
    pub fn zero<S: AsRef<str>>(metrics: &[S]) -> Self {
        Self(
            metrics
                .iter()
                .map(|m| (m.as_ref().to_string(), 0.0))
                .collect(),
        )
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: f64) {
        self.0.insert(name.to_string(), value);
    }

    /// Score for `name`; absent metrics read as 0.0.
    pub fn get(&self, name: &str) -> f64 {
        self.0.get(name).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, f64)> for MetricScores {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Output of data ingestion: where the raw data came from and where the run-local copies live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionArtifact {
    pub raw_data_prefix: String,
    pub ingestion_dir: String,
    pub train_data_key: String,
    pub test_data_key: String,
}

/// Output of data validation. Only `passed` drives the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationArtifact {
    pub passed: bool,
    pub status_report_key: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationArtifact {
    pub transformed_train_key: String,
    pub transformed_test_key: String,
}

/// Freshly trained candidate model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerArtifact {
    pub model_key: String,
    #[serde(default)]
    pub training_metrics: MetricScores,
}

/// Champion/challenger comparison result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationArtifact {
    pub candidate_scores: MetricScores,
    /// Zero sentinel when no champion could be located.
    pub champion_scores: MetricScores,
    pub champion_found: bool,
    pub accepted: bool,
    /// Candidate model key when accepted, otherwise the champion's key.
    pub best_model_key: String,
    pub report_key: String,
}

/// Confirmation that the accepted model was published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PusherArtifact {
    pub bucket: String,
    pub model_key: String,
    pub metrics_key: String,
    pub source_model_key: String,
}

/// Terminal outcome of a training run that did not fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TrainingOutcome {
    /// Every stage ran and the candidate became the champion.
    Published {
        evaluation: EvaluationArtifact,
        pusher: PusherArtifact,
    },
    /// Validation gate closed; nothing after validation ran.
    ValidationFailed { validation: ValidationArtifact },
    /// Promotion gate closed; the champion is unchanged.
    ChallengerRejected { evaluation: EvaluationArtifact },
}

impl TrainingOutcome {
    pub fn summary(&self) -> &'static str {
        match self {
            TrainingOutcome::Published { .. } => "Training completed; new model published.",
            TrainingOutcome::ValidationFailed { .. } => {
                "Training stopped: data validation failed."
            }
            TrainingOutcome::ChallengerRejected { .. } => {
                "Training completed; trained model is not better than the current best model."
            }
        }
    }
}

/// Label predicted for a single text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
}
