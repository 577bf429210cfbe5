//! Model training: fit a candidate on the cleaned training set.

use crate::config::{RunContext, MODEL_TRAINER_DIR, TRAINED_MODEL_FILE};
use crate::stage::{Stage, StageError};
use ml_types::{ArtifactStore, ModelBackend, TrainerArtifact, TransformationArtifact};
use std::sync::Arc;

pub struct ModelTrainer {
    store: Arc<dyn ArtifactStore>,
    backend: Arc<dyn ModelBackend>,
}

impl ModelTrainer {
    pub fn new(store: Arc<dyn ArtifactStore>, backend: Arc<dyn ModelBackend>) -> Self {
        Self { store, backend }
    }
}

#[async_trait::async_trait]
impl Stage<TransformationArtifact> for ModelTrainer {
    type Output = TrainerArtifact;

    fn name(&self) -> &'static str {
        "model_trainer"
    }

    async fn run(
        &self,
        input: &TransformationArtifact,
        ctx: &RunContext,
    ) -> Result<TrainerArtifact, StageError> {
        let train = self
            .store
            .get(&input.transformed_train_key, ctx.bucket())
            .await?;
        let trained = self.backend.train(&train).await?;
        let model_key = ctx.key(MODEL_TRAINER_DIR, TRAINED_MODEL_FILE);
        self.store
            .put(&model_key, &trained.bytes, ctx.bucket())
            .await?;
        tracing::info!(
            run_id = %ctx.run_id,
            model_key = %model_key,
            metrics = ?trained.metrics,
            "candidate model trained"
        );
        Ok(TrainerArtifact {
            model_key,
            training_metrics: trained.metrics,
        })
    }
}
