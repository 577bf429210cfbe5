//! Data transformation: raw CSV rows into cleaned `label,text` datasets.

use crate::config::{
    RunContext, DATA_TRANSFORMATION_DIR, TRANSFORMED_TEST_FILE, TRANSFORMED_TRAIN_FILE,
};
use crate::stage::{Stage, StageError};
use ml_model::text::{clean_text, parse_csv_line, write_dataset, LabeledRecord};
use ml_types::{ArtifactStore, IngestionArtifact, TransformationArtifact};
use std::sync::Arc;

pub struct DataTransformation {
    store: Arc<dyn ArtifactStore>,
    label_names: Vec<String>,
}

impl DataTransformation {
    pub fn new(store: Arc<dyn ArtifactStore>, label_names: Vec<String>) -> Self {
        Self { store, label_names }
    }

    async fn transform_object(
        &self,
        source: &str,
        dest: &str,
        ctx: &RunContext,
    ) -> Result<usize, StageError> {
        let raw = self.store.get(source, ctx.bucket()).await?;
        let records = transform_raw(&raw, &self.label_names)
            .map_err(|e| StageError::InvalidData(format!("{}: {}", source, e)))?;
        self.store
            .put(dest, &write_dataset(&records), ctx.bucket())
            .await?;
        Ok(records.len())
    }
}

/// Maps a raw label to its display name: 1-based numeric indexes go through `label_names`,
/// anything else is kept verbatim.
fn resolve_label(raw: &str, label_names: &[String]) -> String {
    let raw = raw.trim();
    match raw.parse::<usize>() {
        Ok(i) if i >= 1 && i <= label_names.len() => label_names[i - 1].clone(),
        _ => raw.to_string(),
    }
}

/// Parses a raw dataset with a header row. The first column is the label. If a column is named
/// `text` it is the text; otherwise all remaining columns (e.g. title + description) are joined.
/// Rows whose cleaned text is empty are dropped.
pub fn transform_raw(raw: &[u8], label_names: &[String]) -> Result<Vec<LabeledRecord>, String> {
    let content = std::str::from_utf8(raw).map_err(|e| format!("not utf-8: {}", e))?;
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());
    let header = lines.next().ok_or_else(|| "empty file".to_string())?;
    let text_col = parse_csv_line(header)
        .iter()
        .position(|c| c.trim().eq_ignore_ascii_case("text"))
        .filter(|&i| i > 0);

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for line in lines {
        let fields = parse_csv_line(line);
        if fields.len() < 2 || fields[0].trim().is_empty() {
            skipped += 1;
            continue;
        }
        let text = match text_col {
            Some(i) => fields.get(i).cloned().unwrap_or_default(),
            None => fields[1..].join(" "),
        };
        let cleaned = clean_text(&text);
        if cleaned.is_empty() {
            skipped += 1;
            continue;
        }
        records.push(LabeledRecord {
            label: resolve_label(&fields[0], label_names),
            text: cleaned,
        });
    }
    if skipped > 0 {
        tracing::warn!(skipped, "skipped malformed or empty rows");
    }
    if records.is_empty() {
        return Err("no usable rows".to_string());
    }
    Ok(records)
}

#[async_trait::async_trait]
impl Stage<IngestionArtifact> for DataTransformation {
    type Output = TransformationArtifact;

    fn name(&self) -> &'static str {
        "data_transformation"
    }

    async fn run(
        &self,
        input: &IngestionArtifact,
        ctx: &RunContext,
    ) -> Result<TransformationArtifact, StageError> {
        let transformed_train_key = ctx.key(DATA_TRANSFORMATION_DIR, TRANSFORMED_TRAIN_FILE);
        let transformed_test_key = ctx.key(DATA_TRANSFORMATION_DIR, TRANSFORMED_TEST_FILE);
        let train_rows = self
            .transform_object(&input.train_data_key, &transformed_train_key, ctx)
            .await?;
        let test_rows = self
            .transform_object(&input.test_data_key, &transformed_test_key, ctx)
            .await?;
        tracing::info!(run_id = %ctx.run_id, train_rows, test_rows, "data transformed");
        Ok(TransformationArtifact {
            transformed_train_key,
            transformed_test_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        vec!["World".to_string(), "Sports".to_string()]
    }

    #[test]
    fn ag_news_layout_joins_title_and_description() {
        let raw = b"Class Index,Title,Description\n2,\"Cup final\",\"Team wins 3-1 <b>tonight</b>\"\n7,x,Other label\n";
        let records = transform_raw(raw, &labels()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].label, "Sports");
        assert_eq!(records[0].text, "cup final team wins tonight");
        assert_eq!(records[1].label, "7");
    }

    #[test]
    fn explicit_text_column_and_bad_rows() {
        let raw = b"label,text\n1,Hello world\n,missing label\n2,the of\n";
        let records = transform_raw(raw, &labels()).unwrap();
        assert_eq!(
            records,
            vec![LabeledRecord {
                label: "World".to_string(),
                text: "hello world".to_string()
            }]
        );
        assert!(transform_raw(b"label,text\n", &labels()).is_err());
        assert!(transform_raw(b"", &labels()).is_err());
    }
}
