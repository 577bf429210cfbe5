//! Model evaluation: score candidate and champion on the same test set and decide promotion.

use crate::config::{ChampionRef, RunContext, EVALUATION_REPORT_FILE, MODEL_EVALUATION_DIR};
use crate::evaluator::ChampionChallenger;
use crate::stage::{Stage, StageError};
use ml_types::{
    ArtifactStore, EvaluationArtifact, MetricScores, ModelBackend, StoreError, TrainerArtifact,
    TransformationArtifact,
};
use std::sync::Arc;

pub struct ModelEvaluation {
    store: Arc<dyn ArtifactStore>,
    backend: Arc<dyn ModelBackend>,
    champion: ChampionRef,
    evaluator: ChampionChallenger,
}

impl ModelEvaluation {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        backend: Arc<dyn ModelBackend>,
        champion: ChampionRef,
        evaluator: ChampionChallenger,
    ) -> Self {
        Self {
            store,
            backend,
            champion,
            evaluator,
        }
    }

    /// Champion scores on `test`, or `None` when no champion can be located (absent, or the
    /// store cannot serve it). A champion that is found but cannot be scored fails the stage.
    async fn champion_scores(
        &self,
        test: &[u8],
        ctx: &RunContext,
    ) -> Result<Option<MetricScores>, StageError> {
        let key = self.champion.model_key();
        let model = match self.store.exists(&key, ctx.bucket()).await {
            Ok(true) => match self.store.get(&key, ctx.bucket()).await {
                Ok(bytes) => bytes,
                Err(StoreError::NotFound(_)) => return Ok(None),
                Err(e) => {
                    tracing::warn!(error = %e, "champion unreadable, using zero scores");
                    return Ok(None);
                }
            },
            Ok(false) => {
                tracing::info!(key = %key, "no champion model yet, using zero scores");
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!(error = %e, "champion lookup failed, using zero scores");
                return Ok(None);
            }
        };
        match self.backend.evaluate(&model, test).await {
            Ok(scores) => Ok(Some(scores)),
            Err(e) => {
                tracing::error!(key = %key, error = %e, "champion model could not be scored");
                Err(StageError::Model(e))
            }
        }
    }

    fn report(&self, champion: &MetricScores, candidate: &MetricScores) -> String {
        let metrics = self.evaluator.metrics();
        let row = |name: &str, s: &MetricScores| {
            let cols: Vec<String> = metrics.iter().map(|m| s.get(m).to_string()).collect();
            format!("{},{}\n", name, cols.join(","))
        };
        let mut out = format!("model_type,{}\n", metrics.join(","));
        out.push_str(&row("Champion Model", champion));
        out.push_str(&row("Candidate Model", candidate));
        out
    }
}

#[async_trait::async_trait]
impl Stage<(TrainerArtifact, TransformationArtifact)> for ModelEvaluation {
    type Output = EvaluationArtifact;

    fn name(&self) -> &'static str {
        "model_evaluation"
    }

    async fn run(
        &self,
        input: &(TrainerArtifact, TransformationArtifact),
        ctx: &RunContext,
    ) -> Result<EvaluationArtifact, StageError> {
        let (trainer, transformation) = input;
        let test = self
            .store
            .get(&transformation.transformed_test_key, ctx.bucket())
            .await?;
        let candidate = self.store.get(&trainer.model_key, ctx.bucket()).await?;
        let candidate_scores = self.backend.evaluate(&candidate, &test).await?;
        let unreported: Vec<&str> = self
            .evaluator
            .metrics()
            .iter()
            .map(String::as_str)
            .filter(|m| !candidate_scores.contains(m))
            .collect();
        if !unreported.is_empty() {
            return Err(StageError::InvalidData(format!(
                "backend does not report tracked metric(s) {}",
                unreported.join(", ")
            )));
        }

        let champion = self.champion_scores(&test, ctx).await?;
        let champion_found = champion.is_some();
        let champion_scores = champion.unwrap_or_else(|| self.evaluator.zero());

        let report_key = ctx.key(MODEL_EVALUATION_DIR, EVALUATION_REPORT_FILE);
        self.store
            .put(
                &report_key,
                self.report(&champion_scores, &candidate_scores).as_bytes(),
                ctx.bucket(),
            )
            .await?;

        let accepted = self.evaluator.decide(&candidate_scores, &champion_scores);
        let best_model_key = if accepted || !champion_found {
            trainer.model_key.clone()
        } else {
            self.champion.model_key()
        };
        tracing::info!(
            run_id = %ctx.run_id,
            accepted,
            candidate = ?candidate_scores,
            champion = ?champion_scores,
            "model evaluation finished"
        );
        Ok(EvaluationArtifact {
            candidate_scores,
            champion_scores,
            champion_found,
            accepted,
            best_model_key,
            report_key,
        })
    }
}
