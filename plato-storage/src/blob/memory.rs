//! In-memory blob store.
//!
//! Versions are numbered per path starting at 1.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use plato_core::{
    Checksum, EntityKind, PlatoError, PlatoResult, StorageError, StoreKind, VersionId,
};

use super::{version_ref, BlobStore, StoredBlob};

#[derive(Debug, Default, Clone)]
pub struct InMemoryBlobStore {
    versions: Arc<RwLock<HashMap<String, Vec<Vec<u8>>>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of versions held for `path`.
    pub fn version_count(&self, path: &str) -> usize {
        self.versions
            .read()
            .map(|v| v.get(path).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn poisoned() -> StorageError {
        StorageError::LockPoisoned {
            store: StoreKind::BlobStore,
        }
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put_content(&self, path: &str, content: &[u8]) -> PlatoResult<StoredBlob> {
        let mut versions = self.versions.write().map_err(|_| Self::poisoned())?;
        let history = versions.entry(path.to_string()).or_default();
        history.push(content.to_vec());

        Ok(StoredBlob {
            version_id: VersionId::new(history.len().to_string()),
            checksum: Checksum::of(content),
        })
    }

    async fn get_content(&self, path: &str, version_id: &VersionId) -> PlatoResult<Vec<u8>> {
        let versions = self.versions.read().map_err(|_| Self::poisoned())?;
        version_id
            .as_str()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|idx| versions.get(path)?.get(idx).cloned())
            .ok_or_else(|| {
                PlatoError::not_found(EntityKind::BlobVersion, version_ref(path, version_id))
            })
    }
}
