//! PLATO Storage - Store Adapters and Commit Orchestration
//!
//! Capability traits for the three backing stores ([`MetadataStore`],
//! [`BlobStore`], [`Cache`]), in-memory and LMDB implementations of each, the
//! typed [`MetadataIndex`], the project/prompt [`Catalog`], and the
//! [`VersionStore`] that ties them together for branch and commit operations.
//!
//! Stores are injected as `Arc` handles; nothing here is process-global.

pub mod blob;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod index;
pub mod lmdb_env;
pub mod metadata;
pub mod versioning;

pub use blob::{BlobStore, InMemoryBlobStore, LmdbBlobStore, StoredBlob};
pub use cache::{Cache, CacheStats, InMemoryCache, LmdbCache, NoopCache};
#[cfg(feature = "redis-cache")]
pub use cache::RedisCache;
pub use catalog::{Catalog, ProjectUpdate, PromptUpdate};
pub use config::StoreConfig;
pub use index::{IndexedRecord, MetadataIndex};
pub use lmdb_env::open_env;
pub use metadata::{
    InMemoryMetadataStore, LmdbMetadataStore, MetadataItem, MetadataStore, PutCondition,
    ScanOrder,
};
pub use versioning::{LmdbVersionStore, VersionStore};
