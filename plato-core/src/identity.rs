//! Identity types for PLATO records

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// K-sortable commit identifier.
///
/// Generated identifiers are hyphenated UUIDv7 strings. UUIDv7 embeds a Unix
/// millisecond timestamp in its leading bits and `Uuid::now_v7` keeps a
/// per-process counter for IDs minted within the same millisecond, so the
/// lexicographic order of the string form is the creation order. Commit
/// history is ordered by this value directly; there is no sequence counter.
///
/// Identifiers read back from the metadata index are taken verbatim, so
/// records written by older producers (e.g. KSUIDs) still round-trip.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(String);

impl CommitId {
    /// Mint a new identifier that sorts after every identifier minted before it.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CommitId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CommitId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for CommitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Opaque blob version identifier assigned by the blob store on every write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct VersionId(String);

impl VersionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Base64-encoded SHA-256 digest of blob content, the same encoding object
/// stores use for `x-amz-checksum-sha256`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    /// Compute the checksum of exactly these bytes.
    pub fn of(content: &[u8]) -> Self {
        let digest = Sha256::digest(content);
        Self(STANDARD.encode(digest))
    }

    /// Wrap a checksum reported by a backend.
    pub fn from_encoded(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `content` hashes to this checksum.
    pub fn matches(&self, content: &[u8]) -> bool {
        *self == Self::of(content)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
