//! In-memory artifact store (process lifetime only).

use ml_types::{ArtifactStore, StoreError};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory ArtifactStore: bucket -> key -> bytes. Cloning shares the same objects.
#[derive(Clone)]
pub struct InMemoryArtifactStore {
    store: Arc<RwLock<HashMap<String, BTreeMap<String, Vec<u8>>>>>,
    default_bucket: String,
}

impl InMemoryArtifactStore {
    pub fn new(default_bucket: Option<&str>) -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
            default_bucket: default_bucket
                .unwrap_or(crate::DEFAULT_BUCKET)
                .to_string(),
        }
    }

    fn bucket(&self, bucket: Option<&str>) -> String {
        bucket.unwrap_or(&self.default_bucket).to_string()
    }

    /// Number of objects in a bucket.
    pub async fn len(&self, bucket: Option<&str>) -> usize {
        let b = self.bucket(bucket);
        let guard = self.store.read().await;
        guard.get(&b).map(|m| m.len()).unwrap_or(0)
    }

    pub async fn is_empty(&self, bucket: Option<&str>) -> bool {
        self.len(bucket).await == 0
    }
}

impl Default for InMemoryArtifactStore {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait::async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn exists(&self, key: &str, bucket: Option<&str>) -> Result<bool, StoreError> {
        let b = self.bucket(bucket);
        let guard = self.store.read().await;
        Ok(guard.get(&b).map(|m| m.contains_key(key)).unwrap_or(false))
    }

    async fn get(&self, key: &str, bucket: Option<&str>) -> Result<Vec<u8>, StoreError> {
        let b = self.bucket(bucket);
        let guard = self.store.read().await;
        guard
            .get(&b)
            .and_then(|m| m.get(key))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", b, key)))
    }

    async fn put(&self, key: &str, bytes: &[u8], bucket: Option<&str>) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey("empty key".to_string()));
        }
        let b = self.bucket(bucket);
        let mut guard = self.store.write().await;
        guard
            .entry(b)
            .or_default()
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn list_prefix(
        &self,
        prefix: &str,
        bucket: Option<&str>,
    ) -> Result<Vec<String>, StoreError> {
        let b = self.bucket(bucket);
        let guard = self.store.read().await;
        let keys = guard
            .get(&b)
            .map(|m| {
                m.range(prefix.to_string()..)
                    .take_while(|(k, _)| k.starts_with(prefix))
                    .map(|(k, _)| k.clone())
                    .collect()
            })
            .unwrap_or_default();
        Ok(keys)
    }

    fn default_bucket(&self) -> &str {
        &self.default_bucket
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_roundtrip_is_byte_identical() {
        let store = InMemoryArtifactStore::new(Some("b1"));
        let payload: Vec<u8> = (0u8..=255).collect();
        store.put("runs/1/model.json", &payload, None).await.unwrap();
        assert!(store.exists("runs/1/model.json", None).await.unwrap());
        assert_eq!(store.get("runs/1/model.json", None).await.unwrap(), payload);
        // other bucket is isolated
        assert!(!store.exists("runs/1/model.json", Some("b2")).await.unwrap());
        assert!(matches!(
            store.get("runs/1/model.json", Some("b2")).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_prefix_is_sorted_and_bounded() {
        let store = InMemoryArtifactStore::default();
        for key in ["a/2", "a/1", "ab/1", "b/1"] {
            store.put(key, b"x", None).await.unwrap();
        }
        assert_eq!(store.list_prefix("a/", None).await.unwrap(), vec!["a/1", "a/2"]);
        assert_eq!(store.list_prefix("a", None).await.unwrap().len(), 3);
        assert!(store.list_prefix("c", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn repeated_put_is_idempotent() {
        let store = InMemoryArtifactStore::default();
        store.put("k", b"same", None).await.unwrap();
        store.put("k", b"same", None).await.unwrap();
        assert_eq!(store.len(None).await, 1);
        store.copy("k", "k2", None).await.unwrap();
        assert_eq!(store.get("k2", None).await.unwrap(), b"same");
    }
}
