//! Data validation: every required file must be present in the ingestion directory.

use crate::config::{RunContext, DATA_VALIDATION_DIR, VALIDATION_STATUS_FILE};
use crate::stage::{Stage, StageError};
use ml_types::{ArtifactStore, IngestionArtifact, ValidationArtifact};
use std::collections::HashSet;
use std::sync::Arc;

pub struct DataValidation {
    store: Arc<dyn ArtifactStore>,
    required_files: Vec<String>,
}

impl DataValidation {
    pub fn new(store: Arc<dyn ArtifactStore>, required_files: Vec<String>) -> Self {
        Self {
            store,
            required_files,
        }
    }
}

fn status_report(passed: bool, missing: &[String]) -> String {
    let mut report = format!(
        "Validation status: {}\n",
        if passed { "True" } else { "False" }
    );
    if !missing.is_empty() {
        report.push_str(&format!("Missing files: {}\n", missing.join(", ")));
    }
    report
}

#[async_trait::async_trait]
impl Stage<IngestionArtifact> for DataValidation {
    type Output = ValidationArtifact;

    fn name(&self) -> &'static str {
        "data_validation"
    }

    async fn run(
        &self,
        input: &IngestionArtifact,
        ctx: &RunContext,
    ) -> Result<ValidationArtifact, StageError> {
        let bucket = ctx.bucket();
        let prefix = format!("{}/", input.ingestion_dir);
        let present: HashSet<String> = self
            .store
            .list_prefix(&prefix, bucket)
            .await?
            .into_iter()
            .map(|k| k[prefix.len()..].to_string())
            .collect();
        let missing: Vec<String> = self
            .required_files
            .iter()
            .filter(|f| !present.contains(f.as_str()))
            .cloned()
            .collect();
        let passed = missing.is_empty();

        let status_report_key = ctx.key(DATA_VALIDATION_DIR, VALIDATION_STATUS_FILE);
        self.store
            .put(
                &status_report_key,
                status_report(passed, &missing).as_bytes(),
                bucket,
            )
            .await?;
        if passed {
            tracing::info!(run_id = %ctx.run_id, "all required files are present");
        } else {
            tracing::error!(
                run_id = %ctx.run_id,
                missing = %missing.join(", "),
                "missing required files"
            );
        }
        Ok(ValidationArtifact {
            passed,
            status_report_key,
            missing_files: missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lists_missing_files() {
        assert_eq!(status_report(true, &[]), "Validation status: True\n");
        assert_eq!(
            status_report(false, &["test.csv".to_string()]),
            "Validation status: False\nMissing files: test.csv\n"
        );
    }
}
