//! Training job API server: /train, /train-status/:id, /predict, /predict-status/:id.

use ml_api::server::{self, AppState};
use ml_model::NaiveBayesBackend;
use ml_pipeline::{PipelineConfig, PredictionPipeline, TrainingPipeline};
use ml_scheduler::{InMemoryJobStore, InMemoryScheduler, JobStore, SchedulerConfig};
use ml_store::{ArtifactStore, InMemoryArtifactStore, LocalFsArtifactStore};
use ml_types::ModelBackend;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn artifact_store(config: &PipelineConfig) -> Arc<dyn ArtifactStore> {
    match std::env::var("MLOPS_STORE_DIR") {
        Ok(dir) if !dir.trim().is_empty() => {
            tracing::info!(root = %dir, bucket = %config.bucket, "using filesystem artifact store");
            Arc::new(LocalFsArtifactStore::new(dir.trim(), Some(&config.bucket)))
        }
        _ => {
            tracing::warn!("MLOPS_STORE_DIR not set, artifacts are kept in memory only");
            Arc::new(InMemoryArtifactStore::new(Some(&config.bucket)))
        }
    }
}

#[cfg(feature = "sqlite")]
fn job_store() -> Result<Arc<dyn JobStore>, BoxError> {
    match std::env::var("MLOPS_JOB_DB") {
        Ok(path) if !path.trim().is_empty() => {
            tracing::info!(path = %path, "using sqlite job store");
            Ok(Arc::new(ml_scheduler::SqliteJobStore::new(path.trim())?))
        }
        _ => Ok(Arc::new(InMemoryJobStore::new())),
    }
}

#[cfg(not(feature = "sqlite"))]
fn job_store() -> Result<Arc<dyn JobStore>, BoxError> {
    if std::env::var("MLOPS_JOB_DB").is_ok() {
        tracing::warn!("MLOPS_JOB_DB is set but the sqlite feature is disabled; jobs are kept in memory");
    }
    Ok(Arc::new(InMemoryJobStore::new()))
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PipelineConfig::from_env();
    let store = artifact_store(&config);
    let backend: Arc<dyn ModelBackend> = Arc::new(NaiveBayesBackend::default());
    let prediction = Arc::new(PredictionPipeline::new(
        Arc::clone(&store),
        Arc::clone(&backend),
        &config,
    ));
    let training = Arc::new(TrainingPipeline::standard(store, backend, config));

    let scheduler_config = SchedulerConfig::from_env();
    tracing::info!(
        workers = scheduler_config.workers,
        queue_capacity = scheduler_config.queue_capacity,
        "starting job workers"
    );
    let scheduler = Arc::new(InMemoryScheduler::with_store(job_store()?, scheduler_config));

    let state = Arc::new(AppState {
        scheduler,
        training,
        prediction,
    });
    let app = server::router(state);
    let addr: SocketAddr = std::env::var("MLOPS_LISTEN")
        .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        .parse()?;
    tracing::info!("training job API listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app.into_make_service(),
    )
    .await?;
    Ok(())
}
