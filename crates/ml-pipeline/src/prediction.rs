//! Prediction against the current champion.

use crate::config::{ChampionRef, PipelineConfig};
use ml_model::text::clean_text;
use ml_types::{
    ArtifactStore, JobError, JobErrorKind, ModelBackend, ModelError, Prediction, StoreError,
};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("no champion model available at {0}")]
    NoChampion(String),
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("model: {0}")]
    Model(#[from] ModelError),
}

impl PredictionError {
    pub fn to_job_error(&self) -> JobError {
        let kind = match self {
            PredictionError::Store(StoreError::Unavailable(_)) => JobErrorKind::StoreUnavailable,
            _ => JobErrorKind::StageFailure,
        };
        JobError::new(kind, self.to_string())
    }
}

/// Cleans input text like the transformation stage does, then classifies it with the champion.
/// Loads the champion on every call, so a newly published model is picked up by the next
/// prediction without a restart.
pub struct PredictionPipeline {
    store: Arc<dyn ArtifactStore>,
    backend: Arc<dyn ModelBackend>,
    champion: ChampionRef,
    bucket: String,
}

impl PredictionPipeline {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        backend: Arc<dyn ModelBackend>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            store,
            backend,
            champion: config.champion(),
            bucket: config.bucket.clone(),
        }
    }

    pub async fn predict(&self, text: &str) -> Result<Prediction, PredictionError> {
        let key = self.champion.model_key();
        let model = match self.store.get(&key, Some(&self.bucket)).await {
            Ok(bytes) => bytes,
            Err(StoreError::NotFound(_)) => return Err(PredictionError::NoChampion(key)),
            Err(e) => return Err(e.into()),
        };
        let prediction = self.backend.predict(&model, &clean_text(text)).await?;
        tracing::debug!(label = %prediction.label, confidence = prediction.confidence, "prediction made");
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ml_model::MockModelBackend;
    use ml_store::InMemoryArtifactStore;
    use ml_types::MetricScores;

    fn pipeline(store: Arc<InMemoryArtifactStore>, backend: Arc<MockModelBackend>) -> PredictionPipeline {
        PredictionPipeline::new(store, backend, &PipelineConfig::default())
    }

    #[tokio::test]
    async fn without_champion_prediction_fails() {
        let store = Arc::new(InMemoryArtifactStore::new(Some("agnews-data")));
        let backend = Arc::new(MockModelBackend::new(MetricScores::new()));
        let err = pipeline(store, backend.clone())
            .predict("markets rally")
            .await
            .unwrap_err();
        assert!(matches!(err, PredictionError::NoChampion(ref k) if k == "best_model/model.json"));
        assert_eq!(err.to_job_error().kind, JobErrorKind::StageFailure);
        assert_eq!(backend.predict_calls(), 0);
    }

    #[tokio::test]
    async fn uses_latest_champion() {
        let store = Arc::new(InMemoryArtifactStore::new(Some("agnews-data")));
        let backend = Arc::new(MockModelBackend::new(MetricScores::new()).with_label("Business"));
        store
            .put("best_model/model.json", b"champion-v1", None)
            .await
            .unwrap();
        let p = pipeline(store.clone(), backend.clone());
        let first = p.predict("stocks close higher").await.unwrap();
        assert_eq!(first.label, "Business");

        store.put("best_model/model.json", b"", None).await.unwrap();
        let err = p.predict("stocks close higher").await.unwrap_err();
        assert!(matches!(err, PredictionError::Model(_)));
        assert_eq!(backend.predict_calls(), 2);
    }
}
