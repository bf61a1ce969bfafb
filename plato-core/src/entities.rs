//! Metadata records stored in the index.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::identity::{Checksum, CommitId, Timestamp, VersionId};
use crate::status::{RecordStatus, SoftDeletable};

/// A project owned by an org.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub project_id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub status: RecordStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ProjectRecord {
    pub fn new(
        project_id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            project_id: project_id.into(),
            name: name.into(),
            description: description.into(),
            status: RecordStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A prompt belonging to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptRecord {
    pub prompt_id: String,
    pub project_id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub status: RecordStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PromptRecord {
    pub fn new(
        prompt_id: impl Into<String>,
        project_id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            prompt_id: prompt_id.into(),
            project_id: project_id.into(),
            name: name.into(),
            description: description.into(),
            status: RecordStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A named line of history on a prompt. The name is the branch's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchRecord {
    pub name: String,
    #[serde(default)]
    pub status: RecordStatus,
    pub created_at: Timestamp,
}

impl BranchRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: RecordStatus::Active,
            created_at: Utc::now(),
        }
    }
}

/// Input for a new commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCommit {
    pub user_id: String,
    pub message: String,
    pub content: String,
}

impl NewCommit {
    pub fn new(
        user_id: impl Into<String>,
        message: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            message: message.into(),
            content: content.into(),
        }
    }
}

/// An immutable point in a branch's history.
///
/// `content` is never serialized: the metadata index only ever holds the
/// pointer (`version_id`) and `checksum`. Records decoded from the index come
/// back with `content == None` until the content is re-attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    pub commit_id: CommitId,
    pub user_id: String,
    pub version_id: VersionId,
    pub checksum: Checksum,
    pub message: String,
    #[serde(skip)]
    pub content: Option<String>,
    pub created_at: Timestamp,
}

impl CommitRecord {
    /// Record with content detached.
    pub fn without_content(mut self) -> Self {
        self.content = None;
        self
    }

    pub fn with_content(mut self, content: String) -> Self {
        self.content = Some(content);
        self
    }

    /// Whether `content` hashes to the checksum captured at write time.
    pub fn verify_content(&self, content: &str) -> bool {
        self.checksum.matches(content.as_bytes())
    }
}

macro_rules! impl_soft_deletable {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl SoftDeletable for $ty {
                fn status(&self) -> RecordStatus {
                    self.status
                }

                fn set_status(&mut self, status: RecordStatus) {
                    self.status = status;
                }
            }
        )+
    };
}

impl_soft_deletable!(ProjectRecord, PromptRecord, BranchRecord);

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_commit() -> CommitRecord {
        CommitRecord {
            commit_id: CommitId::from("c1"),
            user_id: "u1".to_string(),
            version_id: VersionId::from("1"),
            checksum: Checksum::of(b"Hello"),
            message: "init".to_string(),
            content: Some("Hello".to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_commit_content_never_serialized() {
        let json = serde_json::to_value(sample_commit()).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("content"));
        assert_eq!(obj["commitId"], "c1");
        assert_eq!(obj["versionId"], "1");
    }

    #[test]
    fn test_commit_decodes_without_content() {
        let commit = sample_commit();
        let json = serde_json::to_vec(&commit).unwrap();
        let decoded: CommitRecord = serde_json::from_slice(&json).unwrap();
        assert_eq!(decoded.content, None);
        assert_eq!(decoded, commit.without_content());
    }

    #[test]
    fn test_verify_content() {
        let commit = sample_commit();
        assert!(commit.verify_content("Hello"));
        assert!(!commit.verify_content("hello"));
    }

    #[test]
    fn test_branch_status_defaults_to_active() {
        let json = serde_json::json!({ "name": "main", "createdAt": "2024-05-01T10:00:00Z" });
        let branch: BranchRecord = serde_json::from_value(json).unwrap();
        assert_eq!(branch.status, RecordStatus::Active);
    }

    #[test]
    fn test_branch_soft_delete() {
        let mut branch = BranchRecord::new("main");
        assert!(!branch.is_deleted());
        branch.mark_deleted();
        assert_eq!(branch.status, RecordStatus::Deleted);
    }
}
