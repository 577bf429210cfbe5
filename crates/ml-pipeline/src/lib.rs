//! Training and prediction pipelines.
//!
//! A training run is six typed stages over an [`ArtifactStore`](ml_types::ArtifactStore) with two
//! gates: data validation must pass before anything is trained, and the candidate must
//! non-regress the champion on every tracked metric before it is published.

pub mod config;
mod controller;
mod evaluator;
mod prediction;
mod stage;
pub mod stages;

pub use config::{ChampionRef, PipelineConfig, RunContext};
pub use controller::{TrainingPipeline, TrainingStages};
pub use evaluator::{decide, ChampionChallenger};
pub use prediction::{PredictionError, PredictionPipeline};
pub use stage::{BoxStage, PipelineError, Stage, StageError};
