//! Model backends and text cleaning.

#[cfg(feature = "test-util")]
pub mod mock;
mod naive_bayes;
pub mod text;

pub use ml_types::{ModelBackend, ModelError, TrainedModel};
pub use naive_bayes::{classification_scores, NaiveBayesBackend, METRIC_ACCURACY, METRIC_F1};

#[cfg(feature = "test-util")]
pub use mock::MockModelBackend;
