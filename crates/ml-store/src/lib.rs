//! Artifact store implementations: in-memory and local filesystem.

mod local_fs;
mod memory;

pub use local_fs::LocalFsArtifactStore;
pub use memory::InMemoryArtifactStore;
pub use ml_types::{ArtifactStore, StoreError};

/// Bucket used when a store is built without an explicit default.
pub const DEFAULT_BUCKET: &str = "agnews-data";
