//! Standard stage implementations backed by an [`ArtifactStore`](ml_types::ArtifactStore).

mod evaluation;
mod ingestion;
mod pusher;
mod trainer;
mod transformation;
mod validation;

pub use evaluation::ModelEvaluation;
pub use ingestion::DataIngestion;
pub use pusher::ModelPusher;
pub use trainer::ModelTrainer;
pub use transformation::{transform_raw, DataTransformation};
pub use validation::DataValidation;
