//! Error types for PLATO operations

use std::fmt;
use thiserror::Error;

/// Kind of record or object an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Project,
    Prompt,
    Branch,
    Commit,
    BlobVersion,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            EntityKind::Project => "Project",
            EntityKind::Prompt => "Prompt",
            EntityKind::Branch => "Branch",
            EntityKind::Commit => "Commit",
            EntityKind::BlobVersion => "BlobVersion",
        };
        write!(f, "{}", value)
    }
}

/// Durable store an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    MetadataStore,
    BlobStore,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::MetadataStore => write!(f, "metadata store"),
            StoreKind::BlobStore => write!(f, "blob store"),
        }
    }
}

/// Metadata index and blob store failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Write to {store} failed for {key}: {reason}")]
    WriteFailed {
        store: StoreKind,
        key: String,
        reason: String,
    },

    #[error("Read from {store} failed for {key}: {reason}")]
    ReadFailed {
        store: StoreKind,
        key: String,
        reason: String,
    },

    #[error("Query on {store} failed for partition {partition}: {reason}")]
    QueryFailed {
        store: StoreKind,
        partition: String,
        reason: String,
    },

    #[error("Conditional write to {key} rejected: {condition}")]
    ConditionFailed { key: String, condition: String },

    #[error("Blob version {version_id} referenced by metadata is missing at {path}")]
    DanglingVersion { path: String, version_id: String },

    #[error("Checksum mismatch for {path}@{version_id}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: String,
        version_id: String,
        expected: String,
        actual: String,
    },

    #[error("Failed to open {store}: {reason}")]
    OpenFailed { store: StoreKind, reason: String },

    #[error("{store} lock poisoned")]
    LockPoisoned { store: StoreKind },
}

/// Conversion failures between records and store-native representations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MarshalError {
    #[error("Failed to encode {entity} record: {reason}")]
    Encode { entity: EntityKind, reason: String },

    #[error("Failed to decode {entity} record at {key}: {reason}")]
    Decode {
        entity: EntityKind,
        key: String,
        reason: String,
    },
}

/// Cache failures. Callers log these and fall back; they never reach the
/// caller of a versioning operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Cache operation failed for {key}: {reason}")]
    OperationFailed { key: String, reason: String },

    #[error("Cache entry for {key} is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Cache lock poisoned")]
    LockPoisoned,
}

/// Master error type for all PLATO errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatoError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Marshal error: {0}")]
    Marshal(#[from] MarshalError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("{entity} not found: {key}")]
    NotFound { entity: EntityKind, key: String },

    #[error("{entity} already exists: {key}")]
    AlreadyExists { entity: EntityKind, key: String },
}

impl PlatoError {
    pub fn not_found(entity: EntityKind, key: impl Into<String>) -> Self {
        PlatoError::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn already_exists(entity: EntityKind, key: impl Into<String>) -> Self {
        PlatoError::AlreadyExists {
            entity,
            key: key.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PlatoError::NotFound { .. })
    }
}

/// Result type alias for PLATO operations.
pub type PlatoResult<T> = Result<T, PlatoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_names_store_and_key() {
        let err = StorageError::WriteFailed {
            store: StoreKind::BlobStore,
            key: "prompts/o/p/q/main.txt".to_string(),
            reason: "disk full".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("blob store"));
        assert!(msg.contains("prompts/o/p/q/main.txt"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn test_not_found_display() {
        let err = PlatoError::not_found(EntityKind::Branch, "Org#o1Prompt#p1|Branch#main");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Branch not found: Org#o1Prompt#p1|Branch#main");
    }

    #[test]
    fn test_from_conversions() {
        let err: PlatoError = MarshalError::Encode {
            entity: EntityKind::Commit,
            reason: "bad".to_string(),
        }
        .into();
        assert!(matches!(err, PlatoError::Marshal(_)));

        let err: PlatoError = CacheError::LockPoisoned.into();
        assert!(matches!(err, PlatoError::Cache(CacheError::LockPoisoned)));
    }
}
