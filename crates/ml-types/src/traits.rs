//! Traits for the artifact store and the model backend.

use crate::{MetricScores, Prediction};
use async_trait::async_trait;

/// Object store abstraction (bucket + hierarchical key).
///
/// `bucket: None` addresses the store's default bucket. All operations are idempotent from the
/// caller's side: repeating a `put` with identical bytes has no further effect, and `get`,
/// `exists` and `list_prefix` never mutate.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Whether an object exists at `key`.
    async fn exists(&self, key: &str, bucket: Option<&str>) -> Result<bool, StoreError>;

    /// Read an object. Missing objects are `StoreError::NotFound`.
    async fn get(&self, key: &str, bucket: Option<&str>) -> Result<Vec<u8>, StoreError>;

    /// Write an object, replacing any previous content (last writer wins).
    async fn put(&self, key: &str, bytes: &[u8], bucket: Option<&str>) -> Result<(), StoreError>;

    /// Keys starting with `prefix`, sorted.
    async fn list_prefix(&self, prefix: &str, bucket: Option<&str>)
        -> Result<Vec<String>, StoreError>;

    /// Copy one object to another key. Default implementation uses get + put.
    async fn copy(&self, from: &str, to: &str, bucket: Option<&str>) -> Result<(), StoreError> {
        let bytes = self.get(from, bucket).await?;
        self.put(to, &bytes, bucket).await
    }

    /// Name of the bucket used when `bucket` is `None`.
    fn default_bucket(&self) -> &str;
}

/// A trained model: serialized bytes plus metrics observed while training.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub bytes: Vec<u8>,
    pub metrics: MetricScores,
}

/// Model training/inference backend. Datasets are `label,text` CSV bytes with a header row.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Train a new model on the given dataset.
    async fn train(&self, train_csv: &[u8]) -> Result<TrainedModel, ModelError>;

    /// Score a serialized model on a labelled dataset.
    async fn evaluate(&self, model: &[u8], test_csv: &[u8]) -> Result<MetricScores, ModelError>;

    /// Predict the label of one already-cleaned text.
    async fn predict(&self, model: &[u8], text: &str) -> Result<Prediction, ModelError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("invalid object key: {0}")]
    InvalidKey(String),
    #[error("artifact store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("invalid dataset: {0}")]
    InvalidData(String),
    #[error("invalid model: {0}")]
    InvalidModel(String),
    #[error("model error: {0}")]
    Other(String),
}
