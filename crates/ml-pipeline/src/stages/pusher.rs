//! Model pusher: publish the accepted candidate to the champion location.

use crate::config::{ChampionRef, RunContext};
use crate::stage::{Stage, StageError};
use ml_types::{ArtifactStore, EvaluationArtifact, PusherArtifact};
use std::sync::Arc;

pub struct ModelPusher {
    store: Arc<dyn ArtifactStore>,
    champion: ChampionRef,
}

impl ModelPusher {
    pub fn new(store: Arc<dyn ArtifactStore>, champion: ChampionRef) -> Self {
        Self { store, champion }
    }
}

#[async_trait::async_trait]
impl Stage<EvaluationArtifact> for ModelPusher {
    type Output = PusherArtifact;

    fn name(&self) -> &'static str {
        "model_pusher"
    }

    async fn run(
        &self,
        input: &EvaluationArtifact,
        ctx: &RunContext,
    ) -> Result<PusherArtifact, StageError> {
        if !input.accepted {
            return Err(StageError::InvalidData(
                "evaluation did not accept the candidate".to_string(),
            ));
        }
        let bucket = ctx.bucket();
        let model_key = self.champion.model_key();
        let metrics_key = self.champion.metrics_key();
        // The champion reference is overwritten in place, model first.
        self.store
            .copy(&input.best_model_key, &model_key, bucket)
            .await?;
        let metrics = serde_json::to_vec_pretty(&input.candidate_scores)
            .map_err(|e| StageError::Other(e.to_string()))?;
        self.store.put(&metrics_key, &metrics, bucket).await?;
        tracing::info!(
            run_id = %ctx.run_id,
            bucket = %ctx.bucket,
            model_key = %model_key,
            "published new champion model"
        );
        Ok(PusherArtifact {
            bucket: ctx.bucket.clone(),
            model_key,
            metrics_key,
            source_model_key: input.best_model_key.clone(),
        })
    }
}
