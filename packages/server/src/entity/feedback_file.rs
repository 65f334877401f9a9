use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Relational half of a feedback document. The markdown body and assets live
/// in the blob store under `{id}/`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "feedback_file")]
pub struct Model {
    /// UUIDv7 primary key, also the blob-store key prefix.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub owner_id: i64,
    pub lab_id: i64,
    pub title: String,

    /// SHA-256 hex digest of the stored markdown body.
    pub content_hash: String,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
