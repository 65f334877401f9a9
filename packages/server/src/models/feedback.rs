use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::{Pagination, validate_title};
use crate::entity::feedback_file;
use crate::error::AppError;
use crate::service::{FeedbackDocument, FeedbackPatch};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateFeedbackRequest {
    #[schema(example = 3)]
    pub lab_id: i64,
    #[schema(example = "Lab 3 review")]
    pub title: String,
    /// Markdown body.
    #[schema(example = "# Lab 3\n\nNice work on the parser.")]
    pub content: String,
}

/// Partial update. Absent fields and empty strings leave the stored value
/// unchanged.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateFeedbackRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    /// Only apply the update if the document's `updated_at` still equals
    /// this value; otherwise respond with 409.
    pub expected_updated_at: Option<DateTime<Utc>>,
}

impl UpdateFeedbackRequest {
    pub fn into_patch(self) -> Result<FeedbackPatch, AppError> {
        let mut patch = FeedbackPatch::from_fields(
            self.title.as_deref().unwrap_or_default(),
            self.content.as_deref().unwrap_or_default(),
        );
        if let Some(title) = &patch.title {
            validate_title(title)?;
        }
        patch.expected_updated_at = self.expected_updated_at;
        Ok(patch)
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeedbackListQuery {
    /// Restrict the listing to one lab.
    pub lab_id: Option<i64>,
    /// Page number (1-based, default 1).
    pub page: Option<u64>,
    /// Items per page (1-100, default 20).
    pub per_page: Option<u64>,
}

/// A feedback document including its markdown body.
#[derive(Serialize, utoipa::ToSchema)]
pub struct FeedbackResponse {
    /// Document ID (UUIDv7).
    #[schema(example = "01936f0e-1234-7abc-8000-000000000001")]
    pub id: String,
    pub owner_id: i64,
    pub lab_id: i64,
    pub title: String,
    pub content: String,
    /// SHA-256 of `content`, hex encoded.
    #[schema(example = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")]
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FeedbackDocument> for FeedbackResponse {
    fn from(doc: FeedbackDocument) -> Self {
        Self {
            id: doc.id.to_string(),
            owner_id: doc.owner_id,
            lab_id: doc.lab_id,
            title: doc.title,
            content: doc.content,
            content_hash: doc.content_hash,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

/// Listing entry; the body is not loaded for listings.
#[derive(Serialize, utoipa::ToSchema)]
pub struct FeedbackSummary {
    #[schema(example = "01936f0e-1234-7abc-8000-000000000001")]
    pub id: String,
    pub owner_id: i64,
    pub lab_id: i64,
    pub title: String,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<feedback_file::Model> for FeedbackSummary {
    fn from(model: feedback_file::Model) -> Self {
        Self {
            id: model.id.to_string(),
            owner_id: model.owner_id,
            lab_id: model.lab_id,
            title: model.title,
            content_hash: model.content_hash,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct FeedbackListResponse {
    pub data: Vec<FeedbackSummary>,
    pub pagination: Pagination,
}
