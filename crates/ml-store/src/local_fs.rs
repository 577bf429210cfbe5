//! Filesystem-backed artifact store: `<root>/<bucket>/<key>` (persists across restarts).

use ml_types::{ArtifactStore, StoreError};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// ArtifactStore on a local directory tree. Keys are `/`-separated relative paths.
pub struct LocalFsArtifactStore {
    root: PathBuf,
    default_bucket: String,
}

impl LocalFsArtifactStore {
    pub fn new(root: impl AsRef<Path>, default_bucket: Option<&str>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            default_bucket: default_bucket
                .unwrap_or(crate::DEFAULT_BUCKET)
                .to_string(),
        }
    }

    fn bucket_dir(&self, bucket: Option<&str>) -> Result<PathBuf, StoreError> {
        let b = bucket.unwrap_or(&self.default_bucket);
        check_relative(b)?;
        Ok(self.root.join(b))
    }

    fn object_path(&self, key: &str, bucket: Option<&str>) -> Result<PathBuf, StoreError> {
        check_relative(key)?;
        Ok(self.bucket_dir(bucket)?.join(key))
    }
}

/// Rejects empty, absolute, and parent-escaping keys.
fn check_relative(key: &str) -> Result<(), StoreError> {
    if key.is_empty() {
        return Err(StoreError::InvalidKey("empty key".to_string()));
    }
    let ok = Path::new(key)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

fn io_err(path: &Path, e: std::io::Error) -> StoreError {
    if e.kind() == std::io::ErrorKind::NotFound {
        StoreError::NotFound(path.display().to_string())
    } else {
        StoreError::Unavailable(format!("{}: {}", path.display(), e))
    }
}

#[async_trait::async_trait]
impl ArtifactStore for LocalFsArtifactStore {
    async fn exists(&self, key: &str, bucket: Option<&str>) -> Result<bool, StoreError> {
        let path = self.object_path(key, bucket)?;
        match tokio::fs::metadata(&path).await {
            Ok(m) => Ok(m.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_err(&path, e)),
        }
    }

    async fn get(&self, key: &str, bucket: Option<&str>) -> Result<Vec<u8>, StoreError> {
        let path = self.object_path(key, bucket)?;
        tokio::fs::read(&path).await.map_err(|e| io_err(&path, e))
    }

    async fn put(&self, key: &str, bytes: &[u8], bucket: Option<&str>) -> Result<(), StoreError> {
        let path = self.object_path(key, bucket)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_err(parent, e))?;
        }
        // Write-then-rename so readers never observe a half-written object.
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = path.with_file_name(format!(
            ".{}.tmp-{}-{}",
            file_name,
            std::process::id(),
            TMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        let mut f = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| io_err(&tmp, e))?;
        f.write_all(bytes).await.map_err(|e| io_err(&tmp, e))?;
        f.sync_all().await.map_err(|e| io_err(&tmp, e))?;
        drop(f);
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_err(&path, e))?;
        tracing::debug!(key = %key, bytes = bytes.len(), "object written");
        Ok(())
    }

    async fn list_prefix(
        &self,
        prefix: &str,
        bucket: Option<&str>,
    ) -> Result<Vec<String>, StoreError> {
        let base = self.bucket_dir(bucket)?;
        let mut out = Vec::new();
        let mut pending = vec![base.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(rd) => rd,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(io_err(&dir, e)),
            };
            while let Some(entry) = entries.next_entry().await.map_err(|e| io_err(&dir, e))? {
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(|e| io_err(&path, e))?;
                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                // in-flight writes
                if entry.file_name().to_string_lossy().starts_with('.') {
                    continue;
                }
                let rel = match path.strip_prefix(&base) {
                    Ok(r) => r,
                    Err(_) => continue,
                };
                let key = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if key.starts_with(prefix) {
                    out.push(key);
                }
            }
        }
        out.sort();
        Ok(out)
    }

    fn default_bucket(&self) -> &str {
        &self.default_bucket
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn objects_persist_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsArtifactStore::new(dir.path(), Some("bucket"));
        store
            .put("artifacts/run1/DataIngestionArtifacts/train.csv", b"label,text\n", None)
            .await
            .unwrap();
        store.put("best_model/model.json", b"{}", None).await.unwrap();

        let reopened = LocalFsArtifactStore::new(dir.path(), Some("bucket"));
        assert!(reopened.exists("best_model/model.json", None).await.unwrap());
        assert_eq!(
            reopened
                .get("artifacts/run1/DataIngestionArtifacts/train.csv", None)
                .await
                .unwrap(),
            b"label,text\n"
        );
        assert_eq!(
            reopened.list_prefix("artifacts/", None).await.unwrap(),
            vec!["artifacts/run1/DataIngestionArtifacts/train.csv"]
        );
    }

    #[tokio::test]
    async fn missing_objects_and_buckets() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsArtifactStore::new(dir.path(), None);
        assert!(!store.exists("nope", None).await.unwrap());
        assert!(matches!(store.get("nope", None).await, Err(StoreError::NotFound(_))));
        assert!(store.list_prefix("", Some("empty")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn escaping_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsArtifactStore::new(dir.path(), None);
        assert!(matches!(
            store.put("../outside", b"x", None).await,
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(
            store.get("/etc/passwd", None).await,
            Err(StoreError::InvalidKey(_))
        ));
    }
}
