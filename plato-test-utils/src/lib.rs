//! PLATO Test Utilities
//!
//! Shared test infrastructure for the PLATO workspace:
//! - Proptest generators for identifiers, content and commits
//! - Store wrappers that count calls or inject faults
//! - Fixtures for the common branch/commit scenarios
//! - Assertions for PLATO error and history shapes

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

pub use plato_core::{
    BranchRecord, CacheError, Checksum, CommitId, CommitRecord, CompositeKey, EntityKind,
    NewCommit, PlatoError, PlatoResult, RecordStatus, StorageError, StoreKind, VersionId,
};
pub use plato_storage::{
    BlobStore, Cache, InMemoryBlobStore, InMemoryCache, InMemoryMetadataStore, MetadataItem,
    MetadataStore, NoopCache, PutCondition, ScanOrder, StoredBlob, VersionStore,
};

// ============================================================================
// CACHE WRAPPERS
// ============================================================================

/// Cache wrapper that can be told to error or to report misses.
#[derive(Debug, Default)]
pub struct FlakyCache<C> {
    inner: C,
    fail_gets: AtomicBool,
    fail_sets: AtomicBool,
    force_misses: AtomicBool,
}

impl<C: Cache> FlakyCache<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            fail_gets: AtomicBool::new(false),
            fail_sets: AtomicBool::new(false),
            force_misses: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Make every `get` return `CacheError::Unavailable`.
    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    /// Make every `set` return `CacheError::Unavailable`.
    pub fn fail_sets(&self, fail: bool) {
        self.fail_sets.store(fail, Ordering::SeqCst);
    }

    /// Make every `get` report a miss without consulting the inner cache.
    pub fn force_misses(&self, miss: bool) {
        self.force_misses.store(miss, Ordering::SeqCst);
    }
}

#[async_trait]
impl<C: Cache> Cache for FlakyCache<C> {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        if self.fail_sets.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable {
                reason: "injected set failure".to_string(),
            });
        }
        self.inner.set(key, value, ttl).await
    }

    async fn get(&self, key: &str, ttl: Duration) -> Result<Option<String>, CacheError> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable {
                reason: "injected get failure".to_string(),
            });
        }
        if self.force_misses.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.get(key, ttl).await
    }
}

// ============================================================================
// BLOB STORE WRAPPERS
// ============================================================================

/// Blob store wrapper that counts calls.
#[derive(Debug, Default)]
pub struct CountingBlobStore<B> {
    inner: B,
    puts: AtomicUsize,
    gets: AtomicUsize,
}

impl<B: BlobStore> CountingBlobStore<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            puts: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<B: BlobStore> BlobStore for CountingBlobStore<B> {
    async fn put_content(&self, path: &str, content: &[u8]) -> PlatoResult<StoredBlob> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put_content(path, content).await
    }

    async fn get_content(&self, path: &str, version_id: &VersionId) -> PlatoResult<Vec<u8>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get_content(path, version_id).await
    }
}

/// Fault injected by [`FailingBlobStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlobFault {
    #[default]
    None,
    /// `put_content` fails with `StorageError::WriteFailed`.
    WriteError,
    /// `get_content` fails with `StorageError::ReadFailed`.
    ReadError,
    /// `get_content` reports the version as missing.
    MissingVersion,
    /// `get_content` returns bytes that differ from what was stored.
    CorruptContent,
}

/// Blob store wrapper with a switchable fault.
#[derive(Debug, Default)]
pub struct FailingBlobStore<B> {
    inner: B,
    fault: Mutex<BlobFault>,
}

impl<B: BlobStore> FailingBlobStore<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            fault: Mutex::new(BlobFault::None),
        }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    pub fn set_fault(&self, fault: BlobFault) {
        if let Ok(mut current) = self.fault.lock() {
            *current = fault;
        }
    }

    fn fault(&self) -> BlobFault {
        self.fault.lock().map(|f| *f).unwrap_or_default()
    }
}

#[async_trait]
impl<B: BlobStore> BlobStore for FailingBlobStore<B> {
    async fn put_content(&self, path: &str, content: &[u8]) -> PlatoResult<StoredBlob> {
        if self.fault() == BlobFault::WriteError {
            return Err(StorageError::WriteFailed {
                store: StoreKind::BlobStore,
                key: path.to_string(),
                reason: "injected write failure".to_string(),
            }
            .into());
        }
        self.inner.put_content(path, content).await
    }

    async fn get_content(&self, path: &str, version_id: &VersionId) -> PlatoResult<Vec<u8>> {
        match self.fault() {
            BlobFault::ReadError => Err(StorageError::ReadFailed {
                store: StoreKind::BlobStore,
                key: path.to_string(),
                reason: "injected read failure".to_string(),
            }
            .into()),
            BlobFault::MissingVersion => Err(PlatoError::not_found(
                EntityKind::BlobVersion,
                format!("{path}@{version_id}"),
            )),
            BlobFault::CorruptContent => {
                let mut bytes = self.inner.get_content(path, version_id).await?;
                bytes.extend_from_slice(b" (tampered)");
                Ok(bytes)
            }
            BlobFault::None | BlobFault::WriteError => {
                self.inner.get_content(path, version_id).await
            }
        }
    }
}

// ============================================================================
// METADATA STORE WRAPPERS
// ============================================================================

/// Metadata store wrapper that can reject writes or reads, and counts writes.
#[derive(Debug, Default)]
pub struct FailingMetadataStore<M> {
    inner: M,
    fail_puts: AtomicBool,
    fail_reads: AtomicBool,
    puts: AtomicUsize,
}

impl<M: MetadataStore> FailingMetadataStore<M> {
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            fail_puts: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            puts: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Attempted puts, failed ones included.
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<M: MetadataStore> MetadataStore for FailingMetadataStore<M> {
    async fn put(&self, item: MetadataItem, condition: PutCondition) -> PlatoResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed {
                store: StoreKind::MetadataStore,
                key: item.key.to_string(),
                reason: "injected write failure".to_string(),
            }
            .into());
        }
        self.inner.put(item, condition).await
    }

    async fn get(&self, key: &CompositeKey) -> PlatoResult<Option<MetadataItem>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::ReadFailed {
                store: StoreKind::MetadataStore,
                key: key.to_string(),
                reason: "injected read failure".to_string(),
            }
            .into());
        }
        self.inner.get(key).await
    }

    async fn query(&self, partition: &str, order: ScanOrder) -> PlatoResult<Vec<MetadataItem>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::QueryFailed {
                store: StoreKind::MetadataStore,
                partition: partition.to_string(),
                reason: "injected read failure".to_string(),
            }
            .into());
        }
        self.inner.query(partition, order).await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for PLATO inputs.

    use super::*;
    use proptest::prelude::*;

    /// An org/project/prompt/branch identifier free of key delimiters.
    pub fn arb_identifier() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_-]{1,24}"
    }

    /// Arbitrary prompt content, including unicode and the empty string.
    pub fn arb_content() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            "\\PC{1,256}",
            "[ -~\\n]{1,512}",
        ]
    }

    /// Non-empty prompt content.
    pub fn arb_nonempty_content() -> impl Strategy<Value = String> {
        "\\PC{1,256}"
    }

    pub fn arb_new_commit() -> impl Strategy<Value = NewCommit> {
        (arb_identifier(), "[ -~]{0,64}", arb_content())
            .prop_map(|(user, message, content)| NewCommit::new(user, message, content))
    }

    /// A short history of commits for one branch.
    pub fn arb_commit_history(max_len: usize) -> impl Strategy<Value = Vec<NewCommit>> {
        prop::collection::vec(arb_new_commit(), 1..=max_len)
    }

    pub fn arb_record_status() -> impl Strategy<Value = RecordStatus> {
        prop_oneof![Just(RecordStatus::Active), Just(RecordStatus::Deleted)]
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built stores and inputs for common scenarios.

    use super::*;

    pub const ORG: &str = "org1";
    pub const PROJECT: &str = "proj1";
    pub const PROMPT: &str = "prompt1";
    pub const BRANCH: &str = "main";

    pub fn hello_commit() -> NewCommit {
        NewCommit::new("user1", "Initial version", "Hello")
    }

    pub fn commit_with_content(content: &str) -> NewCommit {
        NewCommit::new("user1", format!("Set content to {content:?}"), content)
    }

    /// Version store whose blob calls are counted and whose cache can be
    /// made to misbehave.
    pub type InstrumentedStore = VersionStore<
        InMemoryMetadataStore,
        CountingBlobStore<InMemoryBlobStore>,
        FlakyCache<InMemoryCache>,
    >;

    /// Handles onto the stores behind an [`InstrumentedStore`].
    pub struct Instrumented {
        pub store: InstrumentedStore,
        pub metadata: Arc<InMemoryMetadataStore>,
        pub blobs: Arc<CountingBlobStore<InMemoryBlobStore>>,
        pub cache: Arc<FlakyCache<InMemoryCache>>,
    }

    pub fn instrumented_store() -> Instrumented {
        let metadata = Arc::new(InMemoryMetadataStore::new());
        let blobs = Arc::new(CountingBlobStore::new(InMemoryBlobStore::new()));
        let cache = Arc::new(FlakyCache::new(InMemoryCache::new()));
        Instrumented {
            store: VersionStore::new(metadata.clone(), blobs.clone(), cache.clone()),
            metadata,
            blobs,
            cache,
        }
    }

    /// Version store over the no-op cache.
    pub fn uncached_store(
    ) -> VersionStore<InMemoryMetadataStore, CountingBlobStore<InMemoryBlobStore>, NoopCache> {
        VersionStore::new(
            Arc::new(InMemoryMetadataStore::new()),
            Arc::new(CountingBlobStore::new(InMemoryBlobStore::new())),
            Arc::new(NoopCache),
        )
    }

    /// Handles onto a store whose durable backends can fail.
    pub struct Faulty {
        pub store: VersionStore<
            FailingMetadataStore<InMemoryMetadataStore>,
            FailingBlobStore<InMemoryBlobStore>,
            FlakyCache<InMemoryCache>,
        >,
        pub metadata: Arc<FailingMetadataStore<InMemoryMetadataStore>>,
        pub blobs: Arc<FailingBlobStore<InMemoryBlobStore>>,
        pub cache: Arc<FlakyCache<InMemoryCache>>,
    }

    pub fn faulty_store() -> Faulty {
        let metadata = Arc::new(FailingMetadataStore::new(InMemoryMetadataStore::new()));
        let blobs = Arc::new(FailingBlobStore::new(InMemoryBlobStore::new()));
        let cache = Arc::new(FlakyCache::new(InMemoryCache::new()));
        Faulty {
            store: VersionStore::new(metadata.clone(), blobs.clone(), cache.clone()),
            metadata,
            blobs,
            cache,
        }
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for PLATO results and histories.

    use super::*;

    /// Assert that a PlatoResult is a NotFound error for `entity`.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &PlatoResult<T>, entity: EntityKind) {
        match result {
            Err(PlatoError::NotFound { entity: e, .. }) => {
                assert_eq!(*e, entity, "Wrong entity in NotFound error");
            }
            other => panic!("Expected NotFound error for {entity}, got: {other:?}"),
        }
    }

    /// Assert that a PlatoResult is an AlreadyExists error for `entity`.
    #[track_caller]
    pub fn assert_already_exists<T: std::fmt::Debug>(result: &PlatoResult<T>, entity: EntityKind) {
        match result {
            Err(PlatoError::AlreadyExists { entity: e, .. }) => {
                assert_eq!(*e, entity, "Wrong entity in AlreadyExists error");
            }
            other => panic!("Expected AlreadyExists error for {entity}, got: {other:?}"),
        }
    }

    /// Assert that a PlatoResult is a storage error raised by `store`.
    #[track_caller]
    pub fn assert_storage_error<T: std::fmt::Debug>(result: &PlatoResult<T>, store: StoreKind) {
        let actual = match result {
            Err(PlatoError::Storage(StorageError::WriteFailed { store, .. }))
            | Err(PlatoError::Storage(StorageError::ReadFailed { store, .. }))
            | Err(PlatoError::Storage(StorageError::QueryFailed { store, .. })) => *store,
            other => panic!("Expected {store} storage error, got: {other:?}"),
        };
        assert_eq!(actual, store, "Storage error raised by the wrong store");
    }

    /// Assert strictly descending commit IDs.
    #[track_caller]
    pub fn assert_newest_first(commits: &[CommitRecord]) {
        for pair in commits.windows(2) {
            assert!(
                pair[0].commit_id > pair[1].commit_id,
                "History out of order: {} listed before {}",
                pair[0].commit_id,
                pair[1].commit_id
            );
        }
    }

    /// Assert that no record carries content.
    #[track_caller]
    pub fn assert_no_content(commits: &[CommitRecord]) {
        for commit in commits {
            assert!(
                commit.content.is_none(),
                "Commit {} unexpectedly carries content",
                commit.commit_id
            );
        }
    }
}
