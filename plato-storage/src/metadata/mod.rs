//! Metadata index abstraction.
//!
//! A flat, partition/sort keyed document store with conditional single-item
//! writes and ordered scans over one partition. Values are opaque encoded
//! records; typed access lives in [`crate::index`].

mod lmdb;
mod memory;

pub use lmdb::LmdbMetadataStore;
pub use memory::InMemoryMetadataStore;

use async_trait::async_trait;
use plato_core::{CompositeKey, PlatoResult};
use std::fmt;

/// One stored record: its composite key plus the encoded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataItem {
    pub key: CompositeKey,
    pub body: Vec<u8>,
}

impl MetadataItem {
    pub fn new(key: CompositeKey, body: Vec<u8>) -> Self {
        Self { key, body }
    }
}

/// Precondition evaluated atomically with a put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PutCondition {
    /// Unconditional overwrite.
    #[default]
    Always,
    /// Fails if a record already exists at the key.
    MustNotExist,
    /// Fails unless a record already exists at the key.
    MustExist,
}

impl PutCondition {
    /// Whether a write may proceed given the current presence of the key.
    pub fn allows(&self, exists: bool) -> bool {
        match self {
            PutCondition::Always => true,
            PutCondition::MustNotExist => !exists,
            PutCondition::MustExist => exists,
        }
    }
}

impl fmt::Display for PutCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PutCondition::Always => write!(f, "always"),
            PutCondition::MustNotExist => write!(f, "must not exist"),
            PutCondition::MustExist => write!(f, "must exist"),
        }
    }
}

/// Sort key order of a partition scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanOrder {
    #[default]
    Ascending,
    Descending,
}

/// Durable keyed store for metadata records.
///
/// Implementations must make `put` with a condition atomic with respect to
/// other writers of the same key.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Write one item, subject to `condition`.
    ///
    /// A failed precondition is reported as
    /// `StorageError::ConditionFailed`.
    async fn put(&self, item: MetadataItem, condition: PutCondition) -> PlatoResult<()>;

    /// Point read. Returns the raw item whatever its lifecycle status.
    async fn get(&self, key: &CompositeKey) -> PlatoResult<Option<MetadataItem>>;

    /// Every item in `partition`, ordered by sort key.
    async fn query(&self, partition: &str, order: ScanOrder) -> PlatoResult<Vec<MetadataItem>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_condition_allows() {
        assert!(PutCondition::Always.allows(true));
        assert!(PutCondition::Always.allows(false));
        assert!(PutCondition::MustNotExist.allows(false));
        assert!(!PutCondition::MustNotExist.allows(true));
        assert!(PutCondition::MustExist.allows(true));
        assert!(!PutCondition::MustExist.allows(false));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(PutCondition::default(), PutCondition::Always);
        assert_eq!(ScanOrder::default(), ScanOrder::Ascending);
    }
}
