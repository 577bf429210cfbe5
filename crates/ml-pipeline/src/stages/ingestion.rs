//! Data ingestion: copy the source dataset into the run's artifact root.

use crate::config::{RunContext, DATA_INGESTION_DIR, TEST_FILE, TRAIN_FILE};
use crate::stage::{Stage, StageError};
use ml_types::{ArtifactStore, IngestionArtifact};
use std::sync::Arc;

pub struct DataIngestion {
    store: Arc<dyn ArtifactStore>,
    raw_data_prefix: String,
}

impl DataIngestion {
    pub fn new(store: Arc<dyn ArtifactStore>, raw_data_prefix: impl Into<String>) -> Self {
        Self {
            store,
            raw_data_prefix: raw_data_prefix.into(),
        }
    }
}

#[async_trait::async_trait]
impl Stage<()> for DataIngestion {
    type Output = IngestionArtifact;

    fn name(&self) -> &'static str {
        "data_ingestion"
    }

    /// Copies every object under the raw prefix. An empty source is not an error here: the
    /// validation stage reports the missing files.
    async fn run(&self, _input: &(), ctx: &RunContext) -> Result<IngestionArtifact, StageError> {
        let bucket = ctx.bucket();
        let source_prefix = format!("{}/", self.raw_data_prefix);
        let ingestion_dir = ctx.dir(DATA_INGESTION_DIR);
        let sources = self.store.list_prefix(&source_prefix, bucket).await?;
        if sources.is_empty() {
            tracing::warn!(prefix = %source_prefix, "no source data found");
        }
        for key in &sources {
            let rel = &key[source_prefix.len()..];
            let dest = format!("{}/{}", ingestion_dir, rel);
            self.store.copy(key, &dest, bucket).await?;
            tracing::debug!(from = %key, to = %dest, "ingested object");
        }
        tracing::info!(
            run_id = %ctx.run_id,
            objects = sources.len(),
            "data ingestion copied source objects"
        );
        Ok(IngestionArtifact {
            raw_data_prefix: self.raw_data_prefix.clone(),
            train_data_key: format!("{}/{}", ingestion_dir, TRAIN_FILE),
            test_data_key: format!("{}/{}", ingestion_dir, TEST_FILE),
            ingestion_dir,
        })
    }
}
