//! Project and prompt records.
//!
//! Projects live under their org's partition and prompts under their
//! project's. Reads hide soft-deleted records; updates and deletes require a
//! live record.

use std::sync::Arc;

use chrono::Utc;
use plato_core::keys::{project_keys, project_partition_key, prompt_keys, prompt_partition_key};
use plato_core::{
    retain_visible, visible, EntityKind, PlatoError, PlatoResult, ProjectRecord, PromptRecord,
};
use uuid::Uuid;

use crate::index::MetadataIndex;
use crate::metadata::{MetadataStore, PutCondition, ScanOrder};

// ============================================================================
// UPDATE TYPES
// ============================================================================

/// Update payload for projects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Update payload for prompts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

pub struct Catalog<M> {
    index: MetadataIndex<M>,
}

impl<M: MetadataStore> Catalog<M> {
    pub fn new(store: Arc<M>) -> Self {
        Self {
            index: MetadataIndex::new(store),
        }
    }

    fn generate_id() -> String {
        Uuid::now_v7().simple().to_string()
    }

    // === Project Operations ===

    /// Create a project with a freshly generated ID.
    pub async fn create_project(
        &self,
        org_id: &str,
        name: &str,
        description: &str,
    ) -> PlatoResult<ProjectRecord> {
        let project = ProjectRecord::new(Self::generate_id(), name, description);
        let key = project_keys(org_id, &project.project_id);
        self.index
            .put_record(key, &project, PutCondition::MustNotExist)
            .await?;
        Ok(project)
    }

    pub async fn get_project(
        &self,
        org_id: &str,
        project_id: &str,
    ) -> PlatoResult<Option<ProjectRecord>> {
        let key = project_keys(org_id, project_id);
        Ok(visible(self.index.get_record(&key).await?))
    }

    pub async fn update_project(
        &self,
        org_id: &str,
        project_id: &str,
        update: ProjectUpdate,
    ) -> PlatoResult<ProjectRecord> {
        let key = project_keys(org_id, project_id);
        let Some(mut project) = visible(self.index.get_record::<ProjectRecord>(&key).await?)
        else {
            return Err(PlatoError::not_found(EntityKind::Project, key.to_string()));
        };

        if let Some(name) = update.name {
            project.name = name;
        }
        if let Some(description) = update.description {
            project.description = description;
        }
        project.updated_at = Utc::now();

        self.index
            .put_record(key, &project, PutCondition::MustExist)
            .await?;
        Ok(project)
    }

    pub async fn delete_project(&self, org_id: &str, project_id: &str) -> PlatoResult<()> {
        let key = project_keys(org_id, project_id);
        self.index
            .soft_delete(key, |project: &mut ProjectRecord| {
                project.updated_at = Utc::now();
            })
            .await
    }

    pub async fn list_projects(&self, org_id: &str) -> PlatoResult<Vec<ProjectRecord>> {
        let partition = project_partition_key(org_id);
        let projects = self
            .index
            .query_records(&partition, ScanOrder::Ascending)
            .await?;
        Ok(retain_visible(projects))
    }

    // === Prompt Operations ===

    /// Create a prompt under `project_id` with a freshly generated ID.
    pub async fn create_prompt(
        &self,
        org_id: &str,
        project_id: &str,
        name: &str,
        description: &str,
    ) -> PlatoResult<PromptRecord> {
        let prompt = PromptRecord::new(Self::generate_id(), project_id, name, description);
        let key = prompt_keys(org_id, project_id, &prompt.prompt_id);
        self.index
            .put_record(key, &prompt, PutCondition::MustNotExist)
            .await?;
        Ok(prompt)
    }

    pub async fn get_prompt(
        &self,
        org_id: &str,
        project_id: &str,
        prompt_id: &str,
    ) -> PlatoResult<Option<PromptRecord>> {
        let key = prompt_keys(org_id, project_id, prompt_id);
        Ok(visible(self.index.get_record(&key).await?))
    }

    pub async fn update_prompt(
        &self,
        org_id: &str,
        project_id: &str,
        prompt_id: &str,
        update: PromptUpdate,
    ) -> PlatoResult<PromptRecord> {
        let key = prompt_keys(org_id, project_id, prompt_id);
        let Some(mut prompt) = visible(self.index.get_record::<PromptRecord>(&key).await?) else {
            return Err(PlatoError::not_found(EntityKind::Prompt, key.to_string()));
        };

        if let Some(name) = update.name {
            prompt.name = name;
        }
        if let Some(description) = update.description {
            prompt.description = description;
        }
        prompt.updated_at = Utc::now();

        self.index
            .put_record(key, &prompt, PutCondition::MustExist)
            .await?;
        Ok(prompt)
    }

    pub async fn delete_prompt(
        &self,
        org_id: &str,
        project_id: &str,
        prompt_id: &str,
    ) -> PlatoResult<()> {
        let key = prompt_keys(org_id, project_id, prompt_id);
        self.index
            .soft_delete(key, |prompt: &mut PromptRecord| {
                prompt.updated_at = Utc::now();
            })
            .await
    }

    pub async fn list_prompts_by_project(
        &self,
        org_id: &str,
        project_id: &str,
    ) -> PlatoResult<Vec<PromptRecord>> {
        let partition = prompt_partition_key(org_id, project_id);
        let prompts = self
            .index
            .query_records(&partition, ScanOrder::Ascending)
            .await?;
        Ok(retain_visible(prompts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::InMemoryMetadataStore;
    use plato_core::RecordStatus;

    fn catalog() -> Catalog<InMemoryMetadataStore> {
        Catalog::new(Arc::new(InMemoryMetadataStore::new()))
    }

    #[tokio::test]
    async fn test_project_lifecycle() {
        let catalog = catalog();
        let project = catalog
            .create_project("org1", "Support bot", "Prompts for support")
            .await
            .unwrap();
        assert_eq!(project.status, RecordStatus::Active);

        let fetched = catalog
            .get_project("org1", &project.project_id)
            .await
            .unwrap();
        assert_eq!(fetched, Some(project.clone()));

        let updated = catalog
            .update_project(
                "org1",
                &project.project_id,
                ProjectUpdate {
                    name: Some("Helpdesk bot".to_string()),
                    description: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Helpdesk bot");
        assert_eq!(updated.description, "Prompts for support");
        assert!(updated.updated_at >= project.updated_at);

        catalog
            .delete_project("org1", &project.project_id)
            .await
            .unwrap();
        assert_eq!(
            catalog.get_project("org1", &project.project_id).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_update_deleted_project_is_not_found() {
        let catalog = catalog();
        let project = catalog.create_project("org1", "p", "").await.unwrap();
        catalog
            .delete_project("org1", &project.project_id)
            .await
            .unwrap();

        let err = catalog
            .update_project("org1", &project.project_id, ProjectUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PlatoError::NotFound {
                entity: EntityKind::Project,
                ..
            }
        ));
        assert!(catalog
            .delete_project("org1", &project.project_id)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_list_projects_scoped_to_org_and_filtered() {
        let catalog = catalog();
        let a = catalog.create_project("org1", "a", "").await.unwrap();
        let b = catalog.create_project("org1", "b", "").await.unwrap();
        catalog.create_project("org2", "other", "").await.unwrap();
        catalog.delete_project("org1", &a.project_id).await.unwrap();

        let listed = catalog.list_projects("org1").await.unwrap();
        assert_eq!(listed, vec![b]);
    }

    #[tokio::test]
    async fn test_prompt_lifecycle() {
        let catalog = catalog();
        let project = catalog.create_project("org1", "proj", "").await.unwrap();
        let first = catalog
            .create_prompt("org1", &project.project_id, "greeting", "Says hello")
            .await
            .unwrap();
        let second = catalog
            .create_prompt("org1", &project.project_id, "farewell", "Says bye")
            .await
            .unwrap();
        assert_eq!(first.project_id, project.project_id);

        let updated = catalog
            .update_prompt(
                "org1",
                &project.project_id,
                &first.prompt_id,
                PromptUpdate {
                    name: None,
                    description: Some("Greets the user".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.description, "Greets the user");

        catalog
            .delete_prompt("org1", &project.project_id, &second.prompt_id)
            .await
            .unwrap();
        let listed = catalog
            .list_prompts_by_project("org1", &project.project_id)
            .await
            .unwrap();
        assert_eq!(listed, vec![updated]);

        assert_eq!(
            catalog
                .get_prompt("org1", &project.project_id, &second.prompt_id)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_update_missing_prompt_is_not_found() {
        let catalog = catalog();
        let err = catalog
            .update_prompt("org1", "proj", "ghost", PromptUpdate::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
