//! Training pipeline controller: runs the stages in order and enforces both gates.
//!
//! ```text
//! ingestion -> validation --(passed)--> transformation -> trainer -> evaluation --(accepted)--> pusher
//! ```
//!
//! A closed gate ends the run with a [`TrainingOutcome`]; only a stage error is a
//! [`PipelineError`]. Each call gets a fresh [`RunContext`], so runs never share artifacts.

use crate::config::{PipelineConfig, RunContext};
use crate::evaluator::ChampionChallenger;
use crate::stage::{BoxStage, PipelineError, Stage};
use crate::stages::{
    DataIngestion, DataTransformation, DataValidation, ModelEvaluation, ModelPusher, ModelTrainer,
};
use ml_types::{
    ArtifactStore, EvaluationArtifact, IngestionArtifact, ModelBackend, PusherArtifact,
    TrainerArtifact, TrainingOutcome, TransformationArtifact, ValidationArtifact,
};
use std::sync::Arc;

/// The six stages of a training run.
pub struct TrainingStages {
    pub ingestion: BoxStage<(), IngestionArtifact>,
    pub validation: BoxStage<IngestionArtifact, ValidationArtifact>,
    pub transformation: BoxStage<IngestionArtifact, TransformationArtifact>,
    pub trainer: BoxStage<TransformationArtifact, TrainerArtifact>,
    pub evaluation: BoxStage<(TrainerArtifact, TransformationArtifact), EvaluationArtifact>,
    pub pusher: BoxStage<EvaluationArtifact, PusherArtifact>,
}

impl TrainingStages {
    /// Store-backed stages wired from `config`.
    pub fn standard(
        store: Arc<dyn ArtifactStore>,
        backend: Arc<dyn ModelBackend>,
        config: &PipelineConfig,
    ) -> Self {
        let champion = config.champion();
        Self {
            ingestion: Box::new(DataIngestion::new(
                Arc::clone(&store),
                config.raw_data_prefix.clone(),
            )),
            validation: Box::new(DataValidation::new(
                Arc::clone(&store),
                config.required_files.clone(),
            )),
            transformation: Box::new(DataTransformation::new(
                Arc::clone(&store),
                config.label_names.clone(),
            )),
            trainer: Box::new(ModelTrainer::new(Arc::clone(&store), Arc::clone(&backend))),
            evaluation: Box::new(ModelEvaluation::new(
                Arc::clone(&store),
                backend,
                champion.clone(),
                ChampionChallenger::new(config.metrics.clone()),
            )),
            pusher: Box::new(ModelPusher::new(store, champion)),
        }
    }
}

pub struct TrainingPipeline {
    stages: TrainingStages,
    config: PipelineConfig,
}

impl TrainingPipeline {
    pub fn new(stages: TrainingStages, config: PipelineConfig) -> Self {
        Self { stages, config }
    }

    pub fn standard(
        store: Arc<dyn ArtifactStore>,
        backend: Arc<dyn ModelBackend>,
        config: PipelineConfig,
    ) -> Self {
        let stages = TrainingStages::standard(store, backend, &config);
        Self::new(stages, config)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// One full training run under a new run root.
    pub async fn run(&self) -> Result<TrainingOutcome, PipelineError> {
        self.run_in(RunContext::new(&self.config)).await
    }

    pub async fn run_in(&self, ctx: RunContext) -> Result<TrainingOutcome, PipelineError> {
        tracing::info!(run_id = %ctx.run_id, root = %ctx.run_root, "training run started");
        let s = &self.stages;

        let ingestion = run_stage(s.ingestion.as_ref(), &(), &ctx).await?;
        let validation = run_stage(s.validation.as_ref(), &ingestion, &ctx).await?;
        if !validation.passed {
            tracing::warn!(run_id = %ctx.run_id, "data validation failed, stopping run");
            return Ok(TrainingOutcome::ValidationFailed { validation });
        }

        let transformation = run_stage(s.transformation.as_ref(), &ingestion, &ctx).await?;
        let trainer = run_stage(s.trainer.as_ref(), &transformation, &ctx).await?;
        let evaluation =
            run_stage(s.evaluation.as_ref(), &(trainer, transformation), &ctx).await?;
        if !evaluation.accepted {
            tracing::info!(
                run_id = %ctx.run_id,
                "trained model is not better than the current best model"
            );
            return Ok(TrainingOutcome::ChallengerRejected { evaluation });
        }

        let pusher = run_stage(s.pusher.as_ref(), &evaluation, &ctx).await?;
        tracing::info!(run_id = %ctx.run_id, model_key = %pusher.model_key, "training run finished");
        Ok(TrainingOutcome::Published { evaluation, pusher })
    }
}

async fn run_stage<I, O>(
    stage: &dyn Stage<I, Output = O>,
    input: &I,
    ctx: &RunContext,
) -> Result<O, PipelineError>
where
    I: Sync,
    O: Send,
{
    let name = stage.name();
    tracing::debug!(run_id = %ctx.run_id, stage = name, "stage started");
    match stage.run(input, ctx).await {
        Ok(out) => {
            tracing::debug!(run_id = %ctx.run_id, stage = name, "stage finished");
            Ok(out)
        }
        Err(source) => {
            tracing::error!(run_id = %ctx.run_id, stage = name, error = %source, "stage failed");
            Err(PipelineError::Stage {
                stage: name,
                source,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StageError;
    use ml_model::MockModelBackend;
    use ml_store::InMemoryArtifactStore;
    use ml_types::{JobErrorKind, MetricScores};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TRAIN: &[u8] = b"Class Index,Title,Description\n1,Talks resume,Leaders meet in Geneva\n2,Cup final,Team wins the trophy\n";
    const TEST: &[u8] = b"Class Index,Title,Description\n3,Stocks rally,Markets close higher\n";

    fn scores(acc: f64, f1: f64) -> MetricScores {
        MetricScores::new().with("accuracy", acc).with("f1", f1)
    }

    async fn seeded_store(files: &[(&str, &[u8])]) -> Arc<InMemoryArtifactStore> {
        let store = Arc::new(InMemoryArtifactStore::new(Some("agnews-data")));
        for (key, bytes) in files {
            store.put(key, bytes, None).await.unwrap();
        }
        store
    }

    fn ctx(config: &PipelineConfig) -> RunContext {
        RunContext::with_run_id(config, "01_01_2026_00_00_00-test0001")
    }

    #[tokio::test]
    async fn first_run_publishes_candidate() {
        let store = seeded_store(&[("raw/train.csv", TRAIN), ("raw/test.csv", TEST)]).await;
        let backend = Arc::new(MockModelBackend::new(scores(0.5, 0.4)));
        let config = PipelineConfig::default();
        let (pipeline, pushes) = counting_pipeline(store.clone(), backend, &config);

        let outcome = pipeline.run_in(ctx(&config)).await.unwrap();
        assert_eq!(pushes.load(Ordering::SeqCst), 1);
        let TrainingOutcome::Published { evaluation, pusher } = outcome else {
            panic!("expected publication");
        };
        assert!(!evaluation.champion_found);
        assert_eq!(evaluation.champion_scores, scores(0.0, 0.0));
        assert_eq!(pusher.model_key, "best_model/model.json");

        let candidate = store.get(&pusher.source_model_key, None).await.unwrap();
        let champion = store.get(&pusher.model_key, None).await.unwrap();
        assert_eq!(candidate, champion);
        let metrics: MetricScores =
            serde_json::from_slice(&store.get(&pusher.metrics_key, None).await.unwrap()).unwrap();
        assert_eq!(metrics, scores(0.5, 0.4));

        let report = store.get(&evaluation.report_key, None).await.unwrap();
        assert_eq!(
            String::from_utf8(report).unwrap(),
            "model_type,accuracy,f1\nChampion Model,0,0\nCandidate Model,0.5,0.4\n"
        );
    }

    #[tokio::test]
    async fn regressing_candidate_leaves_champion_untouched() {
        let store = seeded_store(&[
            ("raw/train.csv", TRAIN),
            ("raw/test.csv", TEST),
            ("best_model/model.json", &b"champion-v1"[..]),
        ])
        .await;
        let backend = Arc::new(MockModelBackend::new(scores(0.91, 0.87)));
        backend.register(b"champion-v1", scores(0.90, 0.88));
        let config = PipelineConfig::default();
        let pipeline = TrainingPipeline::standard(store.clone(), backend.clone(), config.clone());

        let outcome = pipeline.run_in(ctx(&config)).await.unwrap();
        let TrainingOutcome::ChallengerRejected { evaluation } = outcome else {
            panic!("expected rejection");
        };
        assert!(evaluation.champion_found);
        assert_eq!(evaluation.best_model_key, "best_model/model.json");
        assert_eq!(
            store.get("best_model/model.json", None).await.unwrap(),
            b"champion-v1"
        );
        assert!(!store.exists("best_model/metrics.json", None).await.unwrap());
    }

    #[tokio::test]
    async fn tie_replaces_champion() {
        let store = seeded_store(&[
            ("raw/train.csv", TRAIN),
            ("raw/test.csv", TEST),
            ("best_model/model.json", &b"champion-v1"[..]),
        ])
        .await;
        let backend = Arc::new(MockModelBackend::new(scores(0.9, 0.88)));
        backend.register(b"champion-v1", scores(0.9, 0.88));
        let config = PipelineConfig::default();
        let pipeline = TrainingPipeline::standard(store.clone(), backend, config.clone());

        let outcome = pipeline.run_in(ctx(&config)).await.unwrap();
        assert!(matches!(outcome, TrainingOutcome::Published { .. }));
        assert_eq!(
            store.get("best_model/model.json", None).await.unwrap(),
            b"mock-model-0"
        );
    }

    #[tokio::test]
    async fn unscorable_champion_fails_the_run() {
        let store = seeded_store(&[
            ("raw/train.csv", TRAIN),
            ("raw/test.csv", TEST),
            ("best_model/model.json", &b"prod-champion"[..]),
        ])
        .await;
        let backend = Arc::new(MockModelBackend::new(scores(0.01, 0.01)));
        let config = PipelineConfig::default();
        let (pipeline, pushes) = counting_pipeline(store.clone(), backend, &config);

        let err = pipeline.run_in(ctx(&config)).await.unwrap_err();
        assert_eq!(err.stage(), "model_evaluation");
        assert!(matches!(
            err,
            PipelineError::Stage {
                source: StageError::Model(_),
                ..
            }
        ));
        assert_eq!(pushes.load(Ordering::SeqCst), 0);
        assert_eq!(
            store.get("best_model/model.json", None).await.unwrap(),
            b"prod-champion"
        );
    }

    #[tokio::test]
    async fn unreported_metric_fails_evaluation() {
        let store = seeded_store(&[
            ("raw/train.csv", TRAIN),
            ("raw/test.csv", TEST),
            ("best_model/model.json", &b"champion-v1"[..]),
        ])
        .await;
        let backend = Arc::new(MockModelBackend::new(scores(0.1, 0.1)));
        backend.register(b"champion-v1", scores(0.9, 0.9));
        let config = PipelineConfig {
            metrics: vec!["F1".to_string()],
            ..PipelineConfig::default()
        };
        let (pipeline, pushes) = counting_pipeline(store.clone(), backend, &config);

        let err = pipeline.run_in(ctx(&config)).await.unwrap_err();
        assert_eq!(err.stage(), "model_evaluation");
        assert!(err.to_string().contains("F1"), "{}", err);
        assert_eq!(pushes.load(Ordering::SeqCst), 0);
        assert_eq!(
            store.get("best_model/model.json", None).await.unwrap(),
            b"champion-v1"
        );
    }

    #[tokio::test]
    async fn validation_failure_stops_before_transformation() {
        let store = seeded_store(&[("raw/train.csv", TRAIN)]).await;
        let backend = Arc::new(MockModelBackend::new(scores(1.0, 1.0)));
        let config = PipelineConfig::default();
        let pipeline = TrainingPipeline::standard(store.clone(), backend.clone(), config.clone());
        let ctx = ctx(&config);

        let outcome = pipeline.run_in(ctx.clone()).await.unwrap();
        let TrainingOutcome::ValidationFailed { validation } = outcome else {
            panic!("expected validation failure");
        };
        assert_eq!(validation.missing_files, vec!["test.csv"]);
        assert_eq!(backend.train_calls(), 0);
        let written = store.list_prefix(&ctx.run_root, None).await.unwrap();
        assert_eq!(
            written,
            vec![
                format!("{}/DataIngestionArtifacts/train.csv", ctx.run_root),
                format!("{}/DataValidationArtifacts/status.txt", ctx.run_root),
            ]
        );
        assert!(!store.exists("best_model/model.json", None).await.unwrap());
    }

    struct FailingTrainer;

    #[async_trait::async_trait]
    impl Stage<TransformationArtifact> for FailingTrainer {
        type Output = TrainerArtifact;

        fn name(&self) -> &'static str {
            "model_trainer"
        }

        async fn run(
            &self,
            _input: &TransformationArtifact,
            _ctx: &RunContext,
        ) -> Result<TrainerArtifact, StageError> {
            Err(StageError::Other("out of memory".to_string()))
        }
    }

    /// Counts invocations, then publishes through the wrapped pusher.
    struct CountingPusher {
        calls: Arc<AtomicUsize>,
        inner: BoxStage<EvaluationArtifact, PusherArtifact>,
    }

    #[async_trait::async_trait]
    impl Stage<EvaluationArtifact> for CountingPusher {
        type Output = PusherArtifact;

        fn name(&self) -> &'static str {
            "model_pusher"
        }

        async fn run(
            &self,
            input: &EvaluationArtifact,
            ctx: &RunContext,
        ) -> Result<PusherArtifact, StageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.run(input, ctx).await
        }
    }

    fn counting_stages(
        store: Arc<InMemoryArtifactStore>,
        backend: Arc<MockModelBackend>,
        config: &PipelineConfig,
    ) -> (TrainingStages, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut stages = TrainingStages::standard(store.clone(), backend, config);
        stages.pusher = Box::new(CountingPusher {
            calls: calls.clone(),
            inner: Box::new(ModelPusher::new(store, config.champion())),
        });
        (stages, calls)
    }

    fn counting_pipeline(
        store: Arc<InMemoryArtifactStore>,
        backend: Arc<MockModelBackend>,
        config: &PipelineConfig,
    ) -> (TrainingPipeline, Arc<AtomicUsize>) {
        let (stages, calls) = counting_stages(store, backend, config);
        (TrainingPipeline::new(stages, config.clone()), calls)
    }

    #[tokio::test]
    async fn stage_error_fails_the_run() {
        let store = seeded_store(&[("raw/train.csv", TRAIN), ("raw/test.csv", TEST)]).await;
        let backend = Arc::new(MockModelBackend::new(scores(1.0, 1.0)));
        let config = PipelineConfig::default();
        let (mut stages, pushes) = counting_stages(store.clone(), backend, &config);
        stages.trainer = Box::new(FailingTrainer);
        let pipeline = TrainingPipeline::new(stages, config.clone());

        let err = pipeline.run_in(ctx(&config)).await.unwrap_err();
        assert_eq!(err.stage(), "model_trainer");
        let job_err = err.to_job_error();
        assert_eq!(job_err.kind, JobErrorKind::StageFailure);
        assert_eq!(job_err.message, "stage model_trainer failed: out of memory");
        assert_eq!(pushes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejected_candidate_never_reaches_pusher() {
        let store = seeded_store(&[
            ("raw/train.csv", TRAIN),
            ("raw/test.csv", TEST),
            ("best_model/model.json", &b"champion-v1"[..]),
        ])
        .await;
        let backend = Arc::new(MockModelBackend::new(scores(0.2, 0.2)));
        backend.register(b"champion-v1", scores(0.3, 0.1));
        let config = PipelineConfig::default();
        let (pipeline, pushes) = counting_pipeline(store.clone(), backend, &config);

        let outcome = pipeline.run_in(ctx(&config)).await.unwrap();
        assert!(matches!(outcome, TrainingOutcome::ChallengerRejected { .. }));
        assert_eq!(pushes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn separate_runs_use_separate_roots() {
        let store = seeded_store(&[("raw/train.csv", TRAIN), ("raw/test.csv", TEST)]).await;
        let backend = Arc::new(MockModelBackend::new(scores(0.5, 0.5)));
        let config = PipelineConfig::default();
        let pipeline = TrainingPipeline::standard(store.clone(), backend, config.clone());

        let first = RunContext::with_run_id(&config, "run-a");
        let second = RunContext::with_run_id(&config, "run-b");
        pipeline.run_in(first.clone()).await.unwrap();
        pipeline.run_in(second.clone()).await.unwrap();
        let a = store
            .get(&format!("{}/ModelTrainerArtifacts/final_model/model.json", first.run_root), None)
            .await
            .unwrap();
        let b = store
            .get(&format!("{}/ModelTrainerArtifacts/final_model/model.json", second.run_root), None)
            .await
            .unwrap();
        assert_eq!(a, b"mock-model-0");
        assert_eq!(b, b"mock-model-1");
    }
}
