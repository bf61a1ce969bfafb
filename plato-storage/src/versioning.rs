//! Commit orchestration across the metadata index, blob store and cache.
//!
//! Content goes to the blob store, metadata (with a pointer to the blob
//! version and its checksum) goes to the index, and recently touched content
//! is kept in the cache. The cache is best effort: its failures are logged
//! and never change the outcome of an operation.
//!
//! Writes are ordered blob first, then metadata, so a metadata record never
//! points at a version that was not stored. A metadata failure after a
//! successful blob put leaves an unreferenced blob version behind.
//!
//! The cache handle may be a trait object (`dyn Cache`), which lets a store
//! opened from configuration run without a cache when one can not be opened.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use plato_core::keys::{blob_path, commit_cache_key};
use plato_core::{
    BranchRecord, Checksum, CommitId, CommitRecord, EntityKind, MarshalError, NewCommit,
    PlatoError, PlatoResult, StorageError, StoreKind, COMMIT_CACHE_TTL,
};
use tracing::{debug, instrument, warn};

use crate::blob::{BlobStore, InMemoryBlobStore, LmdbBlobStore};
use crate::cache::{Cache, InMemoryCache, LmdbCache, NoopCache};
use crate::config::StoreConfig;
use crate::index::MetadataIndex;
use crate::lmdb_env::open_env;
use crate::metadata::{InMemoryMetadataStore, LmdbMetadataStore, MetadataStore};

/// Version store over LMDB metadata and blobs, with whichever cache could be
/// opened.
pub type LmdbVersionStore = VersionStore<LmdbMetadataStore, LmdbBlobStore, dyn Cache>;

/// Branch and commit operations over injected store handles.
pub struct VersionStore<M, B, C: ?Sized> {
    index: MetadataIndex<M>,
    blobs: Arc<B>,
    cache: Arc<C>,
    cache_ttl: Duration,
}

impl<M, B, C: ?Sized> Clone for VersionStore<M, B, C> {
    fn clone(&self) -> Self {
        Self {
            index: self.index.clone(),
            blobs: Arc::clone(&self.blobs),
            cache: Arc::clone(&self.cache),
            cache_ttl: self.cache_ttl,
        }
    }
}

impl VersionStore<InMemoryMetadataStore, InMemoryBlobStore, InMemoryCache> {
    /// Fully in-process store.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryMetadataStore::new()),
            Arc::new(InMemoryBlobStore::new()),
            Arc::new(InMemoryCache::new()),
        )
    }
}

impl LmdbVersionStore {
    /// Metadata and blobs share the environment at `config.lmdb_path`; the
    /// cache opens its own at `config.lmdb_cache_path()`.
    ///
    /// Cache setup failures are logged and the store runs uncached.
    pub fn open_lmdb(config: &StoreConfig) -> PlatoResult<Self> {
        let env = open_env(
            &config.lmdb_path,
            config.lmdb_map_size_mb,
            StoreKind::MetadataStore,
        )?;
        let metadata = Arc::new(LmdbMetadataStore::with_env(&env)?);
        let blobs = Arc::new(LmdbBlobStore::with_env(&env)?);

        let cache_path = config.lmdb_cache_path();
        let cache: Arc<dyn Cache> =
            match LmdbCache::open(&cache_path, config.lmdb_cache_map_size_mb) {
                Ok(cache) => Arc::new(cache),
                Err(e) => {
                    warn!(
                        path = %cache_path.display(),
                        error = %e,
                        "Commit cache unavailable, continuing without it"
                    );
                    Arc::new(NoopCache)
                }
            };

        Ok(Self::with_config(metadata, blobs, cache, config))
    }
}

impl<M, B, C> VersionStore<M, B, C>
where
    M: MetadataStore,
    B: BlobStore,
    C: Cache + ?Sized,
{
    pub fn new(metadata: Arc<M>, blobs: Arc<B>, cache: Arc<C>) -> Self {
        Self {
            index: MetadataIndex::new(metadata),
            blobs,
            cache,
            cache_ttl: COMMIT_CACHE_TTL,
        }
    }

    pub fn with_config(
        metadata: Arc<M>,
        blobs: Arc<B>,
        cache: Arc<C>,
        config: &StoreConfig,
    ) -> Self {
        Self {
            cache_ttl: config.commit_cache_ttl,
            ..Self::new(metadata, blobs, cache)
        }
    }

    pub fn index(&self) -> &MetadataIndex<M> {
        &self.index
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    // === Branch Operations ===

    #[instrument(skip(self))]
    pub async fn create_branch(
        &self,
        org_id: &str,
        prompt_id: &str,
        branch_name: &str,
    ) -> PlatoResult<BranchRecord> {
        let branch = BranchRecord::new(branch_name);
        self.index.create_branch(org_id, prompt_id, &branch).await?;
        debug!("Branch created");
        Ok(branch)
    }

    #[instrument(skip(self))]
    pub async fn get_branch(
        &self,
        org_id: &str,
        prompt_id: &str,
        branch_name: &str,
    ) -> PlatoResult<Option<BranchRecord>> {
        self.index.get_branch(org_id, prompt_id, branch_name).await
    }

    /// Soft delete. The branch's commits stay in place.
    #[instrument(skip(self))]
    pub async fn delete_branch(
        &self,
        org_id: &str,
        prompt_id: &str,
        branch_name: &str,
    ) -> PlatoResult<()> {
        self.index
            .delete_branch(org_id, prompt_id, branch_name)
            .await?;
        debug!("Branch deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_branches_by_prompt(
        &self,
        org_id: &str,
        prompt_id: &str,
    ) -> PlatoResult<Vec<BranchRecord>> {
        self.index.list_branches_by_prompt(org_id, prompt_id).await
    }

    // === Commit Operations ===

    /// Store `commit.content` as a new blob version and record the commit.
    ///
    /// Returns the created record with content attached.
    #[instrument(skip(self, commit), fields(commit_id = tracing::field::Empty))]
    pub async fn create_commit(
        &self,
        org_id: &str,
        project_id: &str,
        prompt_id: &str,
        branch_name: &str,
        commit: NewCommit,
    ) -> PlatoResult<CommitRecord> {
        let commit_id = CommitId::generate();
        tracing::Span::current().record("commit_id", commit_id.as_str());

        let path = blob_path(org_id, project_id, prompt_id, branch_name);
        let stored = self
            .blobs
            .put_content(&path, commit.content.as_bytes())
            .await?;
        debug!(path = %path, version_id = %stored.version_id, "Commit content stored");

        let record = CommitRecord {
            commit_id,
            user_id: commit.user_id,
            version_id: stored.version_id,
            checksum: stored.checksum,
            message: commit.message,
            content: None,
            created_at: Utc::now(),
        };

        if let Err(e) = self
            .index
            .create_commit_metadata(org_id, prompt_id, branch_name, &record)
            .await
        {
            warn!(
                path = %path,
                version_id = %record.version_id,
                error = %e,
                "Commit metadata write failed, blob version is unreferenced"
            );
            return Err(e);
        }

        let cache_key = commit_cache_key(prompt_id, branch_name, record.commit_id.as_str());
        self.cache_content(&cache_key, &commit.content).await;

        Ok(record.with_content(commit.content))
    }

    /// Fetch one commit with its content.
    ///
    /// `None` when the commit does not exist. Content comes from the cache
    /// when possible and from the blob store otherwise.
    #[instrument(skip(self))]
    pub async fn get_commit(
        &self,
        org_id: &str,
        project_id: &str,
        prompt_id: &str,
        branch_name: &str,
        commit_id: &str,
    ) -> PlatoResult<Option<CommitRecord>> {
        let Some(record) = self
            .index
            .get_commit_metadata(org_id, prompt_id, branch_name, commit_id)
            .await?
        else {
            debug!("Commit not found");
            return Ok(None);
        };

        let cache_key = commit_cache_key(prompt_id, branch_name, commit_id);
        match self.cache.get(&cache_key, self.cache_ttl).await {
            Ok(Some(content)) if !content.is_empty() => {
                if record.verify_content(&content) {
                    debug!(key = %cache_key, "Commit content served from cache");
                    return Ok(Some(record.with_content(content)));
                }
                warn!(key = %cache_key, "Cached content does not match checksum, reading blob store");
            }
            Ok(_) => debug!(key = %cache_key, "Commit content cache miss"),
            Err(e) => warn!(key = %cache_key, error = %e, "Cache read failed, reading blob store"),
        }

        let path = blob_path(org_id, project_id, prompt_id, branch_name);
        let content = self.read_content(&path, &record).await?;
        self.cache_content(&cache_key, &content).await;

        Ok(Some(record.with_content(content)))
    }

    /// Commit history of a branch, newest first, without content.
    #[instrument(skip(self))]
    pub async fn list_commits_by_branch(
        &self,
        org_id: &str,
        project_id: &str,
        prompt_id: &str,
        branch_name: &str,
    ) -> PlatoResult<Vec<CommitRecord>> {
        let commits = self
            .index
            .list_commits_by_branch(org_id, prompt_id, branch_name)
            .await?;
        debug!(count = commits.len(), "Commits listed");
        Ok(commits)
    }

    // === Helpers ===

    /// Read and verify the blob version a commit points at.
    async fn read_content(&self, path: &str, record: &CommitRecord) -> PlatoResult<String> {
        let bytes = match self.blobs.get_content(path, &record.version_id).await {
            Ok(bytes) => bytes,
            Err(PlatoError::NotFound {
                entity: EntityKind::BlobVersion,
                ..
            }) => {
                return Err(StorageError::DanglingVersion {
                    path: path.to_string(),
                    version_id: record.version_id.to_string(),
                }
                .into())
            }
            Err(e) => return Err(e),
        };

        let actual = Checksum::of(&bytes);
        if actual != record.checksum {
            return Err(StorageError::ChecksumMismatch {
                path: path.to_string(),
                version_id: record.version_id.to_string(),
                expected: record.checksum.to_string(),
                actual: actual.to_string(),
            }
            .into());
        }

        String::from_utf8(bytes).map_err(|e| {
            MarshalError::Decode {
                entity: EntityKind::BlobVersion,
                key: format!("{path}@{}", record.version_id),
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn cache_content(&self, key: &str, content: &str) {
        if let Err(e) = self.cache.set(key, content, self.cache_ttl).await {
            warn!(key = %key, error = %e, "Failed to cache commit content");
        }
    }
}
