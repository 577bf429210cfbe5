//! Multinomial naive Bayes text classifier with Laplace smoothing.

use crate::text::{parse_dataset, LabeledRecord};
use ml_types::{MetricScores, ModelBackend, ModelError, Prediction, TrainedModel};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

pub const METRIC_ACCURACY: &str = "accuracy";
pub const METRIC_F1: &str = "f1";

/// Serialized model (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NaiveBayesModel {
    alpha: f64,
    vocabulary_size: usize,
    classes: BTreeMap<String, ClassStats>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ClassStats {
    documents: u64,
    total_tokens: u64,
    token_counts: HashMap<String, u64>,
}

impl NaiveBayesModel {
    fn fit(records: &[LabeledRecord], alpha: f64) -> Self {
        let mut classes: BTreeMap<String, ClassStats> = BTreeMap::new();
        let mut vocabulary = HashSet::new();
        for r in records {
            let stats = classes.entry(r.label.clone()).or_default();
            stats.documents += 1;
            for token in r.text.split_whitespace() {
                *stats.token_counts.entry(token.to_string()).or_default() += 1;
                stats.total_tokens += 1;
                vocabulary.insert(token);
            }
        }
        Self {
            alpha,
            vocabulary_size: vocabulary.len(),
            classes,
        }
    }

    /// Returns (label, posterior probability of that label).
    fn classify(&self, text: &str) -> Option<(String, f64)> {
        let total_docs: u64 = self.classes.values().map(|c| c.documents).sum();
        if total_docs == 0 {
            return None;
        }
        let v = self.vocabulary_size.max(1) as f64;
        let scores: Vec<(&String, f64)> = self
            .classes
            .iter()
            .map(|(label, stats)| {
                let prior = (stats.documents as f64 / total_docs as f64).ln();
                let denom = stats.total_tokens as f64 + self.alpha * v;
                let likelihood: f64 = text
                    .split_whitespace()
                    .map(|t| {
                        let count = stats.token_counts.get(t).copied().unwrap_or(0) as f64;
                        ((count + self.alpha) / denom).ln()
                    })
                    .sum();
                (label, prior + likelihood)
            })
            .collect();
        let (best_label, best) = scores
            .iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;
        // softmax over log scores, shifted by the max for stability
        let norm: f64 = scores.iter().map(|(_, s)| (s - best).exp()).sum();
        Some(((*best_label).clone(), 1.0 / norm))
    }
}

/// Accuracy and support-weighted F1 over (truth, predicted) pairs.
pub fn classification_scores(pairs: &[(String, String)]) -> MetricScores {
    if pairs.is_empty() {
        return MetricScores::zero(&[METRIC_ACCURACY, METRIC_F1]);
    }
    let correct = pairs.iter().filter(|(t, p)| t == p).count();
    let accuracy = correct as f64 / pairs.len() as f64;

    let labels: HashSet<&str> = pairs.iter().map(|(t, _)| t.as_str()).collect();
    let mut weighted_f1 = 0.0;
    for label in labels {
        let tp = pairs.iter().filter(|(t, p)| t == label && p == label).count() as f64;
        let predicted = pairs.iter().filter(|(_, p)| p == label).count() as f64;
        let support = pairs.iter().filter(|(t, _)| t == label).count() as f64;
        let precision = if predicted > 0.0 { tp / predicted } else { 0.0 };
        let recall = tp / support;
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        weighted_f1 += f1 * support / pairs.len() as f64;
    }
    MetricScores::new()
        .with(METRIC_ACCURACY, accuracy)
        .with(METRIC_F1, weighted_f1)
}

/// Built-in backend: naive Bayes over whitespace tokens of already-cleaned text.
pub struct NaiveBayesBackend {
    alpha: f64,
}

impl NaiveBayesBackend {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    fn decode(model: &[u8]) -> Result<NaiveBayesModel, ModelError> {
        serde_json::from_slice(model).map_err(|e| ModelError::InvalidModel(e.to_string()))
    }

    fn score(model: &NaiveBayesModel, records: &[LabeledRecord]) -> Result<MetricScores, ModelError> {
        let mut pairs = Vec::with_capacity(records.len());
        for r in records {
            let (label, _) = model
                .classify(&r.text)
                .ok_or_else(|| ModelError::InvalidModel("model has no classes".to_string()))?;
            pairs.push((r.label.clone(), label));
        }
        Ok(classification_scores(&pairs))
    }
}

impl Default for NaiveBayesBackend {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[async_trait::async_trait]
impl ModelBackend for NaiveBayesBackend {
    async fn train(&self, train_csv: &[u8]) -> Result<TrainedModel, ModelError> {
        let records = parse_dataset(train_csv)?;
        if records.is_empty() {
            return Err(ModelError::InvalidData("training set is empty".to_string()));
        }
        let model = NaiveBayesModel::fit(&records, self.alpha);
        let metrics = Self::score(&model, &records)?;
        let bytes =
            serde_json::to_vec(&model).map_err(|e| ModelError::Other(e.to_string()))?;
        Ok(TrainedModel { bytes, metrics })
    }

    async fn evaluate(&self, model: &[u8], test_csv: &[u8]) -> Result<MetricScores, ModelError> {
        let model = Self::decode(model)?;
        let records = parse_dataset(test_csv)?;
        Self::score(&model, &records)
    }

    async fn predict(&self, model: &[u8], text: &str) -> Result<Prediction, ModelError> {
        let model = Self::decode(model)?;
        let (label, confidence) = model
            .classify(text)
            .ok_or_else(|| ModelError::InvalidModel("model has no classes".to_string()))?;
        Ok(Prediction { label, confidence })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::write_dataset;

    fn rec(label: &str, text: &str) -> LabeledRecord {
        LabeledRecord {
            label: label.to_string(),
            text: text.to_string(),
        }
    }

    fn corpus() -> Vec<u8> {
        write_dataset(&[
            rec("Sports", "team wins match goal"),
            rec("Sports", "coach praises team goal"),
            rec("Business", "stocks fall market shares"),
            rec("Business", "market rally shares profit"),
        ])
    }

    #[tokio::test]
    async fn train_then_predict() {
        let backend = NaiveBayesBackend::default();
        let trained = backend.train(&corpus()).await.unwrap();
        assert_eq!(trained.metrics.get(METRIC_ACCURACY), 1.0);

        let p = backend.predict(&trained.bytes, "market shares").await.unwrap();
        assert_eq!(p.label, "Business");
        assert!(p.confidence > 0.5 && p.confidence <= 1.0);

        let scores = backend.evaluate(&trained.bytes, &corpus()).await.unwrap();
        assert_eq!(scores.get(METRIC_F1), 1.0);
    }

    #[tokio::test]
    async fn rejects_garbage_model_and_empty_training_set() {
        let backend = NaiveBayesBackend::default();
        assert!(matches!(
            backend.predict(b"not json", "x").await,
            Err(ModelError::InvalidModel(_))
        ));
        assert!(matches!(
            backend.train(b"label,text\n").await,
            Err(ModelError::InvalidData(_))
        ));
    }

    #[test]
    fn weighted_f1_matches_hand_computation() {
        let pairs: Vec<(String, String)> = [("a", "a"), ("a", "b"), ("b", "b"), ("b", "b")]
            .iter()
            .map(|(t, p)| (t.to_string(), p.to_string()))
            .collect();
        let s = classification_scores(&pairs);
        assert!((s.get(METRIC_ACCURACY) - 0.75).abs() < 1e-9);
        // a: p=1, r=0.5, f1=2/3; b: p=2/3, r=1, f1=0.8; weighted by support 2/4 each
        assert!((s.get(METRIC_F1) - (2.0 / 3.0 * 0.5 + 0.8 * 0.5)).abs() < 1e-9);
    }
}
