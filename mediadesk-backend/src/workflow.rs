//! Load, save and delete of content records together with their category
//! links and stored payload.
//!
//! The content row and its category relations are written in one repository
//! transaction. The payload is written to the blob store only after that
//! transaction commits, and a failing blob write doesn't undo the commit; it's
//! reported as [Outcome::BlobFailed] instead.

use std::collections::HashSet;
use std::sync::Arc;

use mediadesk_shared::content::PendingFile;
use mediadesk_shared::error::ContentError;
use mediadesk_shared::relation::RelationType;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::blob::BlobStore;
use crate::entity::content;
use crate::image_info::{classify, ImageClass};
use crate::repository::{ContentRepository, RepositoryTransaction};

/// An entry in the list of categories the user can pick from
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategoryOption {
    pub id: Uuid,
    pub name: String,
    pub selected: bool,
}

/// Everything needed to edit one content record. Lives for a single request.
#[derive(Clone, Debug)]
pub struct EditWorkflowState {
    pub content: content::Model,
    /// True until the first successful save
    pub is_new: bool,
    pub content_categories: Vec<Uuid>,
    pub categories: Vec<CategoryOption>,
    pub pending_file: Option<PendingFile>,
}

#[derive(Debug)]
pub enum Outcome {
    Complete,
    /// The database side committed but the blob store didn't keep up.
    BlobFailed(ContentError),
}

impl Outcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, Outcome::Complete)
    }
}

/// Dimensions as the content table stores them, `None` when the payload
/// isn't an image or doesn't fit.
fn stored_dimensions(class: ImageClass) -> Option<(i32, i32)> {
    match class {
        ImageClass::Image { width, height } => {
            i32::try_from(width).ok().zip(i32::try_from(height).ok())
        }
        ImageClass::NotImage => None,
    }
}

#[derive(Clone)]
pub struct ContentEditWorkflow {
    repository: Arc<dyn ContentRepository>,
    blobs: Arc<dyn BlobStore>,
}

impl ContentEditWorkflow {
    pub fn new(repository: Arc<dyn ContentRepository>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { repository, blobs }
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    pub async fn create_new(&self) -> Result<EditWorkflowState, ContentError> {
        Ok(EditWorkflowState {
            content: content::Model::default(),
            is_new: true,
            content_categories: Vec::new(),
            categories: self.category_options(&[]).await?,
            pending_file: None,
        })
    }

    pub async fn load_by_id(&self, id: Uuid) -> Result<EditWorkflowState, ContentError> {
        let content = self.repository.get_by_id(id).await?;
        let content_categories = self
            .repository
            .get_related_ids(id, RelationType::ContentCategory)
            .await?;
        let categories = self.category_options(&content_categories).await?;

        Ok(EditWorkflowState {
            content,
            is_new: false,
            content_categories,
            categories,
            pending_file: None,
        })
    }

    /// Reload the category selection from storage, does nothing for unsaved records.
    pub async fn refresh(&self, state: &mut EditWorkflowState) -> Result<(), ContentError> {
        if state.is_new {
            return Ok(());
        }
        state.content_categories = self
            .repository
            .get_related_ids(state.content.id, RelationType::ContentCategory)
            .await?;
        state.categories = self.category_options(&state.content_categories).await?;
        Ok(())
    }

    /// Persist the record and replace its categories, then store any pending file.
    ///
    /// On error `state` is left as it was. On success the record in `state`
    /// is the persisted one, `is_new` is false and the pending file is gone.
    pub async fn save(&self, state: &mut EditWorkflowState) -> Result<Outcome, ContentError> {
        let mut content = state.content.clone();

        if let Some(file) = state.pending_file.as_ref() {
            match stored_dimensions(classify(&file.data)) {
                Some((width, height)) => {
                    content.is_image = true;
                    content.width = Some(width);
                    content.height = Some(height);
                }
                None => {
                    content.is_image = false;
                    content.width = None;
                    content.height = None;
                }
            }
            content.filename = file.filename.clone();
            content.content_type = file.content_type.clone();
            content.size = file.size();
        }

        let mut categories = Vec::with_capacity(state.content_categories.len());
        let mut seen = HashSet::new();
        for id in &state.content_categories {
            if seen.insert(*id) {
                categories.push(*id);
            }
        }

        let mut tx = self.repository.begin_transaction().await?;
        let saved = match Self::write_record(tx.as_mut(), content, state.is_new, &categories).await
        {
            Ok(saved) => saved,
            Err(err) => {
                error!("Failed to save content: {}", err);
                if let Err(rollback_err) = tx.rollback().await {
                    error!("Failed to roll back content save: {}", rollback_err);
                }
                return Err(err);
            }
        };
        tx.commit().await?;
        debug!(
            "Saved content {} with {} categories",
            saved.id,
            categories.len()
        );

        let outcome = match state.pending_file.take() {
            Some(file) => match self.replace_blob(saved.id, &file.data).await {
                Ok(()) => Outcome::Complete,
                Err(err) => {
                    warn!(
                        "Content {} saved but its file could not be stored: {}",
                        saved.id, err
                    );
                    Outcome::BlobFailed(err)
                }
            },
            None => Outcome::Complete,
        };

        state.content = saved;
        state.is_new = false;
        state.content_categories = categories;
        for option in state.categories.iter_mut() {
            option.selected = state.content_categories.contains(&option.id);
        }

        Ok(outcome)
    }

    /// Delete the record and its relations, then its stored file.
    ///
    /// The file is only touched once the database delete has committed, so a
    /// failed delete leaves everything in place.
    pub async fn delete(&self, state: &EditWorkflowState) -> Result<Outcome, ContentError> {
        let id = state.content.id;

        let mut tx = self.repository.begin_transaction().await?;
        if let Err(err) = Self::remove_record(tx.as_mut(), id).await {
            debug!("Failed to delete content {}: {}", id, err);
            if let Err(rollback_err) = tx.rollback().await {
                error!("Failed to roll back content delete: {}", rollback_err);
            }
            return Err(err);
        }
        tx.commit().await?;
        debug!("Deleted content {}", id);

        match self.remove_blob(id).await {
            Ok(()) => Ok(Outcome::Complete),
            Err(err) => {
                warn!("Content {} deleted but its file was left behind: {}", id, err);
                Ok(Outcome::BlobFailed(err))
            }
        }
    }

    async fn write_record(
        tx: &mut dyn RepositoryTransaction,
        content: content::Model,
        is_new: bool,
        categories: &[Uuid],
    ) -> Result<content::Model, ContentError> {
        let saved = tx.save_content(content, is_new).await?;
        tx.delete_relations_by_data_id(saved.id).await?;
        for category_id in categories {
            tx.insert_relation(saved.id, *category_id, RelationType::ContentCategory)
                .await?;
        }
        Ok(saved)
    }

    async fn remove_record(
        tx: &mut dyn RepositoryTransaction,
        id: Uuid,
    ) -> Result<(), ContentError> {
        tx.delete_relations_by_data_id(id).await?;
        tx.delete_content(id).await
    }

    async fn replace_blob(&self, id: Uuid, data: &[u8]) -> Result<(), ContentError> {
        let path = self.blobs.path_for(id);
        if self.blobs.exists(&path).await? {
            self.blobs.delete(&path).await?;
            self.blobs.invalidate_derived_cache(&path).await?;
        }
        self.blobs.write(&path, data).await
    }

    async fn remove_blob(&self, id: Uuid) -> Result<(), ContentError> {
        let path = self.blobs.path_for(id);
        if self.blobs.exists(&path).await? {
            self.blobs.delete(&path).await?;
        }
        self.blobs.invalidate_derived_cache(&path).await
    }

    async fn category_options(
        &self,
        selected: &[Uuid],
    ) -> Result<Vec<CategoryOption>, ContentError> {
        Ok(self
            .repository
            .list_categories()
            .await?
            .into_iter()
            .map(|category| CategoryOption {
                selected: selected.contains(&category.id),
                id: category.id,
                name: category.name,
            })
            .collect())
    }
}
