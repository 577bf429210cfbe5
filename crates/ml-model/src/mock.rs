//! Mock backend for tests: scripted scores, no real training.

use ml_types::{MetricScores, ModelBackend, ModelError, Prediction, TrainedModel};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Backend whose trained models score exactly what the test asks for.
///
/// `train` returns bytes `mock-model-<n>` and remembers `trained_scores` for them; `evaluate`
/// looks scores up by model bytes, so a champion can be planted with [`MockModelBackend::register`].
pub struct MockModelBackend {
    trained_scores: MetricScores,
    scores: Mutex<HashMap<Vec<u8>, MetricScores>>,
    label: String,
    train_calls: AtomicUsize,
    predict_calls: AtomicUsize,
}

impl MockModelBackend {
    pub fn new(trained_scores: MetricScores) -> Self {
        Self {
            trained_scores,
            scores: Mutex::new(HashMap::new()),
            label: "World".to_string(),
            train_calls: AtomicUsize::new(0),
            predict_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    /// Make `model` evaluate to `scores`.
    pub fn register(&self, model: &[u8], scores: MetricScores) {
        if let Ok(mut guard) = self.scores.lock() {
            guard.insert(model.to_vec(), scores);
        }
    }

    pub fn train_calls(&self) -> usize {
        self.train_calls.load(Ordering::SeqCst)
    }

    pub fn predict_calls(&self) -> usize {
        self.predict_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ModelBackend for MockModelBackend {
    async fn train(&self, _train_csv: &[u8]) -> Result<TrainedModel, ModelError> {
        let n = self.train_calls.fetch_add(1, Ordering::SeqCst);
        let bytes = format!("mock-model-{}", n).into_bytes();
        self.register(&bytes, self.trained_scores.clone());
        Ok(TrainedModel {
            bytes,
            metrics: self.trained_scores.clone(),
        })
    }

    async fn evaluate(&self, model: &[u8], _test_csv: &[u8]) -> Result<MetricScores, ModelError> {
        let guard = self
            .scores
            .lock()
            .map_err(|e| ModelError::Other(e.to_string()))?;
        guard
            .get(model)
            .cloned()
            .ok_or_else(|| ModelError::InvalidModel("unknown mock model".to_string()))
    }

    async fn predict(&self, model: &[u8], _text: &str) -> Result<Prediction, ModelError> {
        self.predict_calls.fetch_add(1, Ordering::SeqCst);
        if model.is_empty() {
            return Err(ModelError::InvalidModel("empty model".to_string()));
        }
        Ok(Prediction {
            label: self.label.clone(),
            confidence: 1.0,
        })
    }
}
