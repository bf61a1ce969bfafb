//! PLATO Core - Record Types
//!
//! Pure data structures shared by every PLATO crate: identities, record
//! lifecycle, metadata records, composite key encoding and errors.
//! This crate contains no I/O.

pub mod entities;
pub mod error;
pub mod identity;
pub mod keys;
pub mod status;

pub use entities::{BranchRecord, CommitRecord, NewCommit, ProjectRecord, PromptRecord};
pub use error::{
    CacheError, EntityKind, MarshalError, PlatoError, PlatoResult, StorageError, StoreKind,
};
pub use identity::{Checksum, CommitId, Timestamp, VersionId};
pub use keys::{CompositeKey, COMMIT_CACHE_TTL};
pub use status::{retain_visible, visible, RecordStatus, SoftDeletable};
