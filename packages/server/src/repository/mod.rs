//! Relational half of the feedback store.

mod feedback;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

use crate::entity::feedback_file;

pub use feedback::SeaOrmMetadataStore;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("feedback {0} not found")]
    NotFound(Uuid),

    /// A conditional update found a different `updated_at` than expected.
    #[error("feedback {0} was modified since it was read")]
    Stale(Uuid),

    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

/// Fields supplied by the caller on insert. The store assigns `id`,
/// `created_at` and `updated_at`.
#[derive(Debug, Clone)]
pub struct NewFeedbackRecord {
    pub owner_id: i64,
    pub lab_id: i64,
    pub title: String,
    pub content_hash: String,
}

/// Full replacement of the mutable columns of one record.
#[derive(Debug, Clone)]
pub struct FeedbackRecordUpdate {
    pub id: Uuid,
    pub title: String,
    pub content_hash: String,
    /// When set, the update only applies if the stored `updated_at` still
    /// equals this value.
    pub expected_updated_at: Option<DateTime<Utc>>,
}

/// CRUD and paginated listing over feedback metadata rows.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn create(&self, record: NewFeedbackRecord)
    -> Result<feedback_file::Model, MetadataError>;

    async fn get_by_id(&self, id: Uuid) -> Result<feedback_file::Model, MetadataError>;

    /// Overwrite title and content hash and bump `updated_at`.
    async fn update(
        &self,
        update: FeedbackRecordUpdate,
    ) -> Result<feedback_file::Model, MetadataError>;

    /// Fails with `NotFound` when no row was deleted.
    async fn delete(&self, id: Uuid) -> Result<(), MetadataError>;

    /// Records of `owner_id` (optionally narrowed to one lab), newest first,
    /// together with the total number of matching records.
    async fn list_by_owner(
        &self,
        owner_id: i64,
        lab_id: Option<i64>,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<feedback_file::Model>, u64), MetadataError>;
}
