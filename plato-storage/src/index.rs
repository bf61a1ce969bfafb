//! Typed metadata index.
//!
//! Wraps a [`MetadataStore`] with record marshalling, content stripping for
//! commits and soft-delete read filtering. Everything above this layer sees
//! deleted records as absent.

use std::sync::Arc;

use plato_core::keys::{branch_keys, branch_partition_key, commit_keys, commit_partition_key};
use plato_core::{
    retain_visible, visible, BranchRecord, CommitRecord, CompositeKey, EntityKind, MarshalError,
    PlatoError, PlatoResult, ProjectRecord, PromptRecord, SoftDeletable, StorageError,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::metadata::{MetadataItem, MetadataStore, PutCondition, ScanOrder};

/// A record type persisted in the metadata index.
pub trait IndexedRecord: Serialize + DeserializeOwned + Send + Sync {
    const ENTITY: EntityKind;
}

impl IndexedRecord for ProjectRecord {
    const ENTITY: EntityKind = EntityKind::Project;
}

impl IndexedRecord for PromptRecord {
    const ENTITY: EntityKind = EntityKind::Prompt;
}

impl IndexedRecord for BranchRecord {
    const ENTITY: EntityKind = EntityKind::Branch;
}

impl IndexedRecord for CommitRecord {
    const ENTITY: EntityKind = EntityKind::Commit;
}

pub struct MetadataIndex<M> {
    store: Arc<M>,
}

impl<M> Clone for MetadataIndex<M> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<M: MetadataStore> MetadataIndex<M> {
    pub fn new(store: Arc<M>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<M> {
        &self.store
    }

    // ========================================================================
    // RECORD ACCESS
    // ========================================================================

    fn encode<R: IndexedRecord>(record: &R) -> PlatoResult<Vec<u8>> {
        serde_json::to_vec(record).map_err(|e| {
            MarshalError::Encode {
                entity: R::ENTITY,
                reason: e.to_string(),
            }
            .into()
        })
    }

    fn decode<R: IndexedRecord>(item: &MetadataItem) -> PlatoResult<R> {
        serde_json::from_slice(&item.body).map_err(|e| {
            MarshalError::Decode {
                entity: R::ENTITY,
                key: item.key.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Write `record` at `key`. A failed precondition becomes
    /// `AlreadyExists` or `NotFound` for the record's entity.
    pub(crate) async fn put_record<R: IndexedRecord>(
        &self,
        key: CompositeKey,
        record: &R,
        condition: PutCondition,
    ) -> PlatoResult<()> {
        let body = Self::encode(record)?;
        let entity = R::ENTITY;
        let key_str = key.to_string();

        match self.store.put(MetadataItem::new(key, body), condition).await {
            Ok(()) => {
                debug!(entity = %entity, key = %key_str, "Metadata record written");
                Ok(())
            }
            Err(PlatoError::Storage(StorageError::ConditionFailed { .. })) => match condition {
                PutCondition::MustNotExist => Err(PlatoError::already_exists(entity, key_str)),
                _ => Err(PlatoError::not_found(entity, key_str)),
            },
            Err(e) => Err(e),
        }
    }

    /// Raw point read, soft-deleted records included.
    pub(crate) async fn get_record<R: IndexedRecord>(
        &self,
        key: &CompositeKey,
    ) -> PlatoResult<Option<R>> {
        self.store
            .get(key)
            .await?
            .map(|item| Self::decode::<R>(&item))
            .transpose()
    }

    pub(crate) async fn query_records<R: IndexedRecord>(
        &self,
        partition: &str,
        order: ScanOrder,
    ) -> PlatoResult<Vec<R>> {
        self.store
            .query(partition, order)
            .await?
            .iter()
            .map(Self::decode::<R>)
            .collect()
    }

    /// Flip a record to `Deleted` in place, applying `touch` to it first.
    ///
    /// A missing or already-deleted record is `NotFound`.
    pub(crate) async fn soft_delete<R, F>(&self, key: CompositeKey, touch: F) -> PlatoResult<()>
    where
        R: IndexedRecord + SoftDeletable,
        F: FnOnce(&mut R) + Send,
    {
        let Some(mut record) = visible(self.get_record::<R>(&key).await?) else {
            return Err(PlatoError::not_found(R::ENTITY, key.to_string()));
        };
        touch(&mut record);
        record.mark_deleted();
        self.put_record(key, &record, PutCondition::MustExist).await
    }

    // ========================================================================
    // COMMIT METADATA
    // ========================================================================

    /// Persist a commit's metadata. Content is never written.
    pub async fn create_commit_metadata(
        &self,
        org_id: &str,
        prompt_id: &str,
        branch_name: &str,
        commit: &CommitRecord,
    ) -> PlatoResult<()> {
        let key = commit_keys(org_id, prompt_id, branch_name, commit.commit_id.as_str());
        let record = commit.clone().without_content();
        self.put_record(key, &record, PutCondition::MustNotExist).await
    }

    /// `None` when no commit exists under the key.
    pub async fn get_commit_metadata(
        &self,
        org_id: &str,
        prompt_id: &str,
        branch_name: &str,
        commit_id: &str,
    ) -> PlatoResult<Option<CommitRecord>> {
        let key = commit_keys(org_id, prompt_id, branch_name, commit_id);
        self.get_record(&key).await
    }

    /// Every commit of a branch, newest first.
    pub async fn list_commits_by_branch(
        &self,
        org_id: &str,
        prompt_id: &str,
        branch_name: &str,
    ) -> PlatoResult<Vec<CommitRecord>> {
        let partition = commit_partition_key(org_id, prompt_id, branch_name);
        self.query_records(&partition, ScanOrder::Descending).await
    }

    // ========================================================================
    // BRANCHES
    // ========================================================================

    /// Fails with `AlreadyExists` if any record, deleted or not, holds the name.
    pub async fn create_branch(
        &self,
        org_id: &str,
        prompt_id: &str,
        branch: &BranchRecord,
    ) -> PlatoResult<()> {
        let key = branch_keys(org_id, prompt_id, &branch.name);
        self.put_record(key, branch, PutCondition::MustNotExist).await
    }

    pub async fn get_branch(
        &self,
        org_id: &str,
        prompt_id: &str,
        branch_name: &str,
    ) -> PlatoResult<Option<BranchRecord>> {
        let key = branch_keys(org_id, prompt_id, branch_name);
        Ok(visible(self.get_record(&key).await?))
    }

    pub async fn delete_branch(
        &self,
        org_id: &str,
        prompt_id: &str,
        branch_name: &str,
    ) -> PlatoResult<()> {
        let key = branch_keys(org_id, prompt_id, branch_name);
        self.soft_delete::<BranchRecord, _>(key, |_| {}).await
    }

    /// Live branches of a prompt, ordered by name.
    pub async fn list_branches_by_prompt(
        &self,
        org_id: &str,
        prompt_id: &str,
    ) -> PlatoResult<Vec<BranchRecord>> {
        let partition = branch_partition_key(org_id, prompt_id);
        let branches = self.query_records(&partition, ScanOrder::Ascending).await?;
        Ok(retain_visible(branches))
    }
}
