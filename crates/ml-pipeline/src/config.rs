//! Pipeline configuration, per-run artifact layout, and the champion reference.

use chrono::Utc;
use uuid::Uuid;

pub const DATA_INGESTION_DIR: &str = "DataIngestionArtifacts";
pub const DATA_VALIDATION_DIR: &str = "DataValidationArtifacts";
pub const DATA_TRANSFORMATION_DIR: &str = "DataTransformationArtifacts";
pub const MODEL_TRAINER_DIR: &str = "ModelTrainerArtifacts";
pub const MODEL_EVALUATION_DIR: &str = "ModelEvaluationArtifacts";

pub const TRAIN_FILE: &str = "train.csv";
pub const TEST_FILE: &str = "test.csv";
pub const VALIDATION_STATUS_FILE: &str = "status.txt";
pub const TRANSFORMED_TRAIN_FILE: &str = "transformed_train.csv";
pub const TRANSFORMED_TEST_FILE: &str = "transformed_test.csv";
pub const TRAINED_MODEL_FILE: &str = "final_model/model.json";
pub const EVALUATION_REPORT_FILE: &str = "model_evaluation.csv";

const RUN_TIMESTAMP_FORMAT: &str = "%m_%d_%Y_%H_%M_%S";

/// Settings shared by the training and prediction pipelines.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Bucket holding raw data, run artifacts, and the champion.
    pub bucket: String,
    /// Metrics that must all be non-regressing for a candidate to be promoted.
    pub metrics: Vec<String>,
    /// Prefix of the source dataset objects (`<prefix>/train.csv`, `<prefix>/test.csv`).
    pub raw_data_prefix: String,
    /// Prefix under which each run gets its own timestamped root.
    pub artifacts_root: String,
    /// Well-known, non-versioned location of the current best model.
    pub champion_prefix: String,
    pub required_files: Vec<String>,
    /// Names for 1-based numeric class indexes in the raw data.
    pub label_names: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bucket: "agnews-data".to_string(),
            metrics: vec!["accuracy".to_string(), "f1".to_string()],
            raw_data_prefix: "raw".to_string(),
            artifacts_root: "artifacts".to_string(),
            champion_prefix: "best_model".to_string(),
            required_files: vec![TEST_FILE.to_string(), TRAIN_FILE.to_string()],
            label_names: ["World", "Sports", "Business", "Sci/Tech"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `MLOPS_BUCKET`, `MLOPS_METRICS`, `MLOPS_RAW_DATA_PREFIX`,
    /// `MLOPS_ARTIFACTS_ROOT`, `MLOPS_CHAMPION_PREFIX`, `MLOPS_LABELS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let non_empty = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        if let Some(v) = non_empty("MLOPS_BUCKET") {
            cfg.bucket = v;
        }
        if let Some(v) = non_empty("MLOPS_METRICS") {
            let metrics = split_list(&v);
            if !metrics.is_empty() {
                cfg.metrics = metrics;
            }
        }
        if let Some(v) = non_empty("MLOPS_RAW_DATA_PREFIX") {
            cfg.raw_data_prefix = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = non_empty("MLOPS_ARTIFACTS_ROOT") {
            cfg.artifacts_root = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = non_empty("MLOPS_CHAMPION_PREFIX") {
            cfg.champion_prefix = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = non_empty("MLOPS_LABELS") {
            cfg.label_names = split_list(&v);
        }
        cfg
    }

    pub fn champion(&self) -> ChampionRef {
        ChampionRef {
            prefix: self.champion_prefix.clone(),
        }
    }
}

fn split_list(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// The single-writer reference cell holding the current best model.
#[derive(Debug, Clone, PartialEq)]
pub struct ChampionRef {
    pub prefix: String,
}

impl ChampionRef {
    pub fn model_key(&self) -> String {
        format!("{}/model.json", self.prefix)
    }

    pub fn metrics_key(&self) -> String {
        format!("{}/metrics.json", self.prefix)
    }
}

/// Identity and artifact root of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    pub run_id: String,
    /// `<artifacts_root>/<MM_DD_YYYY_HH_MM_SS>-<suffix>`
    pub run_root: String,
    pub bucket: String,
}

impl RunContext {
    /// New run rooted at the current UTC time. The random suffix keeps two runs started in the
    /// same second apart.
    pub fn new(config: &PipelineConfig) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        let run_id = format!(
            "{}-{}",
            Utc::now().format(RUN_TIMESTAMP_FORMAT),
            &suffix[..8]
        );
        Self::with_run_id(config, run_id)
    }

    pub fn with_run_id(config: &PipelineConfig, run_id: impl Into<String>) -> Self {
        let run_id = run_id.into();
        Self {
            run_root: format!("{}/{}", config.artifacts_root, run_id),
            run_id,
            bucket: config.bucket.clone(),
        }
    }

    /// `<run_root>/<dir>`
    pub fn dir(&self, dir: &str) -> String {
        format!("{}/{}", self.run_root, dir)
    }

    /// `<run_root>/<dir>/<file>`
    pub fn key(&self, dir: &str, file: &str) -> String {
        format!("{}/{}/{}", self.run_root, dir, file)
    }

    pub fn bucket(&self) -> Option<&str> {
        Some(&self.bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn env_overrides_defaults() {
        let vars: HashMap<&str, &str> = [
            ("MLOPS_BUCKET", "models-prod"),
            ("MLOPS_METRICS", " accuracy , precision ,"),
            ("MLOPS_CHAMPION_PREFIX", "champion/"),
            ("MLOPS_ARTIFACTS_ROOT", "   "),
        ]
        .into_iter()
        .collect();
        let cfg = PipelineConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.bucket, "models-prod");
        assert_eq!(cfg.metrics, vec!["accuracy", "precision"]);
        assert_eq!(cfg.champion().model_key(), "champion/model.json");
        assert_eq!(cfg.artifacts_root, "artifacts");
    }

    #[test]
    fn empty_metric_list_keeps_default() {
        let cfg = PipelineConfig::from_lookup(|k| (k == "MLOPS_METRICS").then(|| ",".to_string()));
        assert_eq!(cfg.metrics, vec!["accuracy", "f1"]);
    }

    #[test]
    fn run_layout_is_deterministic_under_root() {
        let cfg = PipelineConfig::default();
        let ctx = RunContext::with_run_id(&cfg, "01_02_2026_03_04_05-abcd1234");
        assert_eq!(
            ctx.key(DATA_INGESTION_DIR, TRAIN_FILE),
            "artifacts/01_02_2026_03_04_05-abcd1234/DataIngestionArtifacts/train.csv"
        );
        let fresh = RunContext::new(&cfg);
        assert!(fresh.run_root.starts_with("artifacts/"));
        assert_ne!(fresh.run_id, RunContext::new(&cfg).run_id);
    }
}
