//! Axum server and routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use ml_pipeline::{PredictionPipeline, TrainingPipeline};
use ml_scheduler::{JobWork, Scheduler};
use ml_types::{ErrorResponse, JobKind, JobResult, PredictRequest, StatusResponse, SubmitResponse};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub struct AppState {
    pub scheduler: Arc<dyn Scheduler + Send + Sync>,
    pub training: Arc<TrainingPipeline>,
    pub prediction: Arc<PredictionPipeline>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            code: status.as_u16(),
            message: message.into(),
        }),
    )
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/train", get(handle_train))
        .route("/train-status/:job_id", get(handle_train_status))
        .route("/predict", post(handle_predict))
        .route("/predict-status/:job_id", get(handle_predict_status))
        .route("/health", get(handle_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn submit(state: &AppState, kind: JobKind, work: JobWork) -> ApiResult<SubmitResponse> {
    match state.scheduler.submit(kind, work).await {
        Ok(job_id) => Ok(Json(SubmitResponse {
            job_id,
            message: format!("Submitted {} job.", kind),
        })),
        Err(e) => {
            tracing::error!(kind = %kind, error = %e, "job submission failed");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

async fn handle_train(State(state): State<Arc<AppState>>) -> ApiResult<SubmitResponse> {
    let pipeline = Arc::clone(&state.training);
    let work: JobWork = Box::pin(async move {
        pipeline
            .run()
            .await
            .map(JobResult::Training)
            .map_err(|e| e.to_job_error())
    });
    submit(&state, JobKind::Training, work).await
}

async fn handle_predict(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PredictRequest>,
) -> ApiResult<SubmitResponse> {
    let Some(text) = req.trimmed_text().map(str::to_string) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "text must not be empty"));
    };
    let pipeline = Arc::clone(&state.prediction);
    let work: JobWork = Box::pin(async move {
        pipeline
            .predict(&text)
            .await
            .map(JobResult::Inference)
            .map_err(|e| e.to_job_error())
    });
    submit(&state, JobKind::Inference, work).await
}

/// Status of a job of `kind`; a job of the other kind is reported as not found.
async fn job_status(state: &AppState, kind: JobKind, job_id: &str) -> ApiResult<StatusResponse> {
    match state.scheduler.get_status(job_id).await {
        Ok(Some(job)) if job.kind == kind => Ok(Json(StatusResponse::from(job))),
        Ok(_) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("{} job not found: {}", kind, job_id),
        )),
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

async fn handle_train_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<StatusResponse> {
    job_status(&state, JobKind::Training, &job_id).await
}

async fn handle_predict_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<StatusResponse> {
    job_status(&state, JobKind::Inference, &job_id).await
}

async fn handle_health() -> &'static str {
    "ok"
}
