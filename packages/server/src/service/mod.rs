//! Transport-agnostic feedback document API and its coordinator.

mod error;
mod feedback;
pub mod keys;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::entity::feedback_file;

pub use error::{FeedbackError, StoreError};
pub use feedback::FeedbackCoordinator;

pub const MARKDOWN_CONTENT_TYPE: &str = "text/markdown";

pub const DEFAULT_PER_PAGE: u64 = 20;
pub const MAX_PER_PAGE: u64 = 100;

/// A feedback document assembled from both stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackDocument {
    pub id: Uuid,
    pub owner_id: i64,
    pub lab_id: i64,
    pub title: String,
    pub content: String,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FeedbackDocument {
    pub fn from_parts(record: feedback_file::Model, content: String) -> Self {
        Self {
            id: record.id,
            owner_id: record.owner_id,
            lab_id: record.lab_id,
            title: record.title,
            content,
            content_hash: record.content_hash,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Blob-store view of one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetInfo {
    pub filename: String,
    pub size: u64,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateFeedback {
    pub owner_id: i64,
    pub lab_id: i64,
    pub title: String,
    pub content: String,
}

/// Fields to change on an existing document. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    /// Apply the update only if the document's `updated_at` still equals this.
    pub expected_updated_at: Option<DateTime<Utc>>,
}

impl FeedbackPatch {
    /// Build a patch from the plain-string convention where an empty string
    /// means "leave unchanged".
    pub fn from_fields(title: &str, content: &str) -> Self {
        Self {
            title: (!title.is_empty()).then(|| title.to_string()),
            content: (!content.is_empty()).then(|| content.to_string()),
            expected_updated_at: None,
        }
    }

    pub fn changes_nothing(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct ListFeedback {
    pub owner_id: i64,
    pub lab_id: Option<i64>,
    /// 1-based. Zero is treated as the first page.
    pub page: u64,
    /// Zero selects [`DEFAULT_PER_PAGE`]; capped at [`MAX_PER_PAGE`].
    pub per_page: u64,
}

impl ListFeedback {
    /// Effective `(page, per_page, offset)`.
    pub fn window(&self) -> (u64, u64, u64) {
        let page = self.page.max(1);
        let per_page = match self.per_page {
            0 => DEFAULT_PER_PAGE,
            n => n.min(MAX_PER_PAGE),
        };
        (page, per_page, (page - 1) * per_page)
    }
}

/// One page of metadata records. Bodies are not loaded for listings.
#[derive(Debug, Clone)]
pub struct FeedbackPage {
    pub records: Vec<feedback_file::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Document and asset operations, independent of any wire protocol.
#[async_trait]
pub trait FeedbackService: Send + Sync {
    async fn create_feedback(&self, request: CreateFeedback)
    -> Result<FeedbackDocument, FeedbackError>;

    async fn get_feedback(&self, id: Uuid) -> Result<FeedbackDocument, FeedbackError>;

    /// Relational record only; does not touch the blob store.
    async fn feedback_metadata(&self, id: Uuid) -> Result<feedback_file::Model, FeedbackError>;

    async fn update_feedback(
        &self,
        id: Uuid,
        patch: FeedbackPatch,
    ) -> Result<FeedbackDocument, FeedbackError>;

    async fn delete_feedback(&self, id: Uuid) -> Result<(), FeedbackError>;

    async fn list_feedback(&self, query: ListFeedback) -> Result<FeedbackPage, FeedbackError>;

    /// Store an asset, replacing any asset with the same filename. Returns
    /// the number of bytes written.
    async fn upload_asset(
        &self,
        feedback_id: Uuid,
        filename: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<u64, FeedbackError>;

    async fn download_asset(
        &self,
        feedback_id: Uuid,
        filename: &str,
    ) -> Result<(AssetInfo, Vec<u8>), FeedbackError>;

    async fn list_assets(&self, feedback_id: Uuid) -> Result<Vec<AssetInfo>, FeedbackError>;

    async fn delete_asset(&self, feedback_id: Uuid, filename: &str) -> Result<(), FeedbackError>;
}
