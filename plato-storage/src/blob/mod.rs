//! Versioned blob store abstraction.
//!
//! Every branch owns one logical path. Each put creates a new immutable
//! version of that path and returns an opaque version identifier; any past
//! version stays readable by `(path, version_id)`.

mod lmdb;
mod memory;

pub use lmdb::LmdbBlobStore;
pub use memory::InMemoryBlobStore;

use async_trait::async_trait;
use plato_core::{Checksum, PlatoResult, VersionId};

/// Outcome of a successful content write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub version_id: VersionId,
    /// SHA-256 of the stored bytes, as computed by the store.
    pub checksum: Checksum,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `content` as a new version of `path`.
    async fn put_content(&self, path: &str, content: &[u8]) -> PlatoResult<StoredBlob>;

    /// Read one version of `path`.
    ///
    /// An unknown path or version is `PlatoError::NotFound` with
    /// `EntityKind::BlobVersion`.
    async fn get_content(&self, path: &str, version_id: &VersionId) -> PlatoResult<Vec<u8>>;
}

/// Key used in `NotFound` errors for a missing version.
pub(crate) fn version_ref(path: &str, version_id: &VersionId) -> String {
    format!("{path}@{version_id}")
}
