use std::sync::Arc;

use async_trait::async_trait;
use common::storage::{BlobStore, ContentHash};
use tracing::instrument;
use uuid::Uuid;

use super::keys;
use super::{
    AssetInfo, CreateFeedback, FeedbackDocument, FeedbackError, FeedbackPage, FeedbackPatch,
    FeedbackService, ListFeedback, MARKDOWN_CONTENT_TYPE,
};
use crate::entity::feedback_file;
use crate::repository::{FeedbackRecordUpdate, MetadataError, MetadataStore, NewFeedbackRecord};
use crate::utils::filename::validate_flat_filename;

/// Keeps the relational record and the blob-store objects of each feedback
/// document in step.
///
/// There is no transaction spanning both stores. Each operation orders its
/// writes so that a failure leaves the least harmful state and compensates
/// where it can:
///
/// - create: metadata, then content; a failed content write deletes the
///   metadata again.
/// - update: metadata, then content; a failed content write is reported, the
///   stored hash is then ahead of the stored content.
/// - delete: all objects under `{id}/`, then metadata; a failed object delete
///   leaves the metadata untouched so the delete can be retried.
///
/// Holds no per-document state, so concurrent requests only contend inside
/// the stores.
pub struct FeedbackCoordinator {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
}

impl FeedbackCoordinator {
    pub fn new(metadata: Arc<dyn MetadataStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { metadata, blobs }
    }

    async fn read_content(&self, id: Uuid) -> Result<String, FeedbackError> {
        let bytes = self
            .blobs
            .get(&keys::content_key(id))
            .await
            .map_err(|e| FeedbackError::read(format!("read content of feedback {id}"), e))?;

        String::from_utf8(bytes).map_err(|e| FeedbackError::StorageReadFailed {
            context: format!("content of feedback {id} is not UTF-8"),
            source: common::storage::StorageError::Backend(e.to_string()).into(),
        })
    }
}

fn asset_filename(filename: &str) -> Result<&str, FeedbackError> {
    validate_flat_filename(filename)
        .map_err(|e| FeedbackError::InvalidArgument(e.message().to_string()))
}

#[async_trait]
impl FeedbackService for FeedbackCoordinator {
    #[instrument(skip(self, request), fields(owner_id = request.owner_id, lab_id = request.lab_id))]
    async fn create_feedback(
        &self,
        request: CreateFeedback,
    ) -> Result<FeedbackDocument, FeedbackError> {
        let content_hash = ContentHash::compute(request.content.as_bytes());

        let record = self
            .metadata
            .create(NewFeedbackRecord {
                owner_id: request.owner_id,
                lab_id: request.lab_id,
                title: request.title,
                content_hash: content_hash.to_hex(),
            })
            .await
            .map_err(|e| FeedbackError::write("insert feedback metadata", e))?;

        let id = record.id;
        if let Err(err) = self
            .blobs
            .put(
                &keys::content_key(id),
                request.content.as_bytes(),
                MARKDOWN_CONTENT_TYPE,
            )
            .await
        {
            let context = format!("write content of feedback {id}");
            tracing::warn!(feedback_id = %id, "Content write failed, removing metadata: {}", err);

            return Err(match self.metadata.delete(id).await {
                Ok(()) => FeedbackError::StorageWriteFailed {
                    context,
                    source: err.into(),
                },
                Err(compensation) => {
                    tracing::error!(
                        feedback_id = %id,
                        "Orphaned feedback metadata without content: {}",
                        compensation
                    );
                    FeedbackError::CompensationFailed {
                        context,
                        source: err.into(),
                        compensation: compensation.into(),
                    }
                }
            });
        }

        tracing::debug!(feedback_id = %id, hash = %content_hash, "Created feedback");
        Ok(FeedbackDocument::from_parts(record, request.content))
    }

    #[instrument(skip(self))]
    async fn get_feedback(&self, id: Uuid) -> Result<FeedbackDocument, FeedbackError> {
        let record = self.feedback_metadata(id).await?;
        let content = self.read_content(id).await?;
        Ok(FeedbackDocument::from_parts(record, content))
    }

    async fn feedback_metadata(&self, id: Uuid) -> Result<feedback_file::Model, FeedbackError> {
        self.metadata
            .get_by_id(id)
            .await
            .map_err(|e| FeedbackError::read(format!("read feedback {id}"), e))
    }

    #[instrument(skip(self, patch), fields(title = patch.title.is_some(), content = patch.content.is_some()))]
    async fn update_feedback(
        &self,
        id: Uuid,
        patch: FeedbackPatch,
    ) -> Result<FeedbackDocument, FeedbackError> {
        let existing = self.feedback_metadata(id).await?;

        if patch.changes_nothing() {
            let content = self.read_content(id).await?;
            return Ok(FeedbackDocument::from_parts(existing, content));
        }

        let content_hash = match &patch.content {
            Some(content) => ContentHash::compute(content.as_bytes()).to_hex(),
            None => existing.content_hash,
        };

        let record = self
            .metadata
            .update(FeedbackRecordUpdate {
                id,
                title: patch.title.unwrap_or(existing.title),
                content_hash,
                expected_updated_at: patch.expected_updated_at,
            })
            .await
            .map_err(|e| FeedbackError::write(format!("update metadata of feedback {id}"), e))?;

        let content = match patch.content {
            Some(content) => {
                if let Err(err) = self
                    .blobs
                    .put(
                        &keys::content_key(id),
                        content.as_bytes(),
                        MARKDOWN_CONTENT_TYPE,
                    )
                    .await
                {
                    tracing::error!(
                        feedback_id = %id,
                        "Stored hash no longer matches stored content: {}",
                        err
                    );
                    return Err(FeedbackError::write(
                        format!("write content of feedback {id}"),
                        err,
                    ));
                }
                content
            }
            None => self.read_content(id).await?,
        };

        Ok(FeedbackDocument::from_parts(record, content))
    }

    #[instrument(skip(self))]
    async fn delete_feedback(&self, id: Uuid) -> Result<(), FeedbackError> {
        let removed = self
            .blobs
            .delete_prefix(&keys::document_prefix(id))
            .await
            .map_err(|e| {
                tracing::warn!(feedback_id = %id, "Object delete failed, metadata kept: {}", e);
                FeedbackError::write(format!("delete objects of feedback {id}"), e)
            })?;
        tracing::debug!(feedback_id = %id, removed, "Deleted feedback objects");

        self.metadata.delete(id).await.map_err(|e| {
            if removed > 0 && !matches!(e, MetadataError::NotFound(_)) {
                tracing::error!(
                    feedback_id = %id,
                    "Feedback metadata left without content: {}",
                    e
                );
            }
            FeedbackError::write(format!("delete metadata of feedback {id}"), e)
        })
    }

    #[instrument(skip(self, query), fields(owner_id = query.owner_id, lab_id = query.lab_id))]
    async fn list_feedback(&self, query: ListFeedback) -> Result<FeedbackPage, FeedbackError> {
        let (page, per_page, offset) = query.window();
        let (records, total) = self
            .metadata
            .list_by_owner(query.owner_id, query.lab_id, offset, per_page)
            .await
            .map_err(|e| FeedbackError::read("list feedback", e))?;

        Ok(FeedbackPage {
            records,
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self, data), fields(size = data.len()))]
    async fn upload_asset(
        &self,
        feedback_id: Uuid,
        filename: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<u64, FeedbackError> {
        let filename = asset_filename(filename)?;
        self.blobs
            .put(&keys::asset_key(feedback_id, filename), data, content_type)
            .await
            .map_err(|e| {
                FeedbackError::write(
                    format!("write asset {filename} of feedback {feedback_id}"),
                    e,
                )
            })?;
        Ok(data.len() as u64)
    }

    #[instrument(skip(self))]
    async fn download_asset(
        &self,
        feedback_id: Uuid,
        filename: &str,
    ) -> Result<(AssetInfo, Vec<u8>), FeedbackError> {
        let filename = asset_filename(filename)?;
        let key = keys::asset_key(feedback_id, filename);
        let context = || format!("read asset {filename} of feedback {feedback_id}");

        let data = self
            .blobs
            .get(&key)
            .await
            .map_err(|e| FeedbackError::read(context(), e))?;
        // Separate round trip; the object may be gone by now.
        let info = self
            .blobs
            .stat(&key)
            .await
            .map_err(|e| FeedbackError::read(context(), e))?;

        Ok((
            AssetInfo {
                filename: filename.to_string(),
                size: info.size,
                content_type: info.content_type,
                uploaded_at: info.last_modified,
            },
            data,
        ))
    }

    #[instrument(skip(self))]
    async fn list_assets(&self, feedback_id: Uuid) -> Result<Vec<AssetInfo>, FeedbackError> {
        let prefix = keys::assets_prefix(feedback_id);
        let objects = self.blobs.list(&prefix).await.map_err(|e| {
            FeedbackError::read(format!("list assets of feedback {feedback_id}"), e)
        })?;

        Ok(objects
            .into_iter()
            .filter_map(|object| {
                let filename = object.key.strip_prefix(&prefix)?.to_string();
                Some(AssetInfo {
                    filename,
                    size: object.size,
                    content_type: object.content_type,
                    uploaded_at: object.last_modified,
                })
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn delete_asset(&self, feedback_id: Uuid, filename: &str) -> Result<(), FeedbackError> {
        let filename = asset_filename(filename)?;
        let context = format!("delete asset {filename} of feedback {feedback_id}");
        let existed = self
            .blobs
            .delete(&keys::asset_key(feedback_id, filename))
            .await
            .map_err(|e| FeedbackError::write(context.clone(), e))?;
        if !existed {
            return Err(FeedbackError::NotFound(context));
        }
        Ok(())
    }
}
