use async_trait::async_trait;
use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::*;
use uuid::Uuid;

use super::{FeedbackRecordUpdate, MetadataError, MetadataStore, NewFeedbackRecord};
use crate::entity::feedback_file;

/// [`MetadataStore`] over the `feedback_file` table.
#[derive(Clone)]
pub struct SeaOrmMetadataStore {
    db: DatabaseConnection,
}

impl SeaOrmMetadataStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MetadataStore for SeaOrmMetadataStore {
    async fn create(
        &self,
        record: NewFeedbackRecord,
    ) -> Result<feedback_file::Model, MetadataError> {
        let now = Utc::now();
        let model = feedback_file::ActiveModel {
            id: Set(Uuid::now_v7()),
            owner_id: Set(record.owner_id),
            lab_id: Set(record.lab_id),
            title: Set(record.title),
            content_hash: Set(record.content_hash),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(model.insert(&self.db).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<feedback_file::Model, MetadataError> {
        feedback_file::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(MetadataError::NotFound(id))
    }

    async fn update(
        &self,
        update: FeedbackRecordUpdate,
    ) -> Result<feedback_file::Model, MetadataError> {
        let mut query = feedback_file::Entity::update_many()
            .col_expr(feedback_file::Column::Title, Expr::value(update.title))
            .col_expr(
                feedback_file::Column::ContentHash,
                Expr::value(update.content_hash),
            )
            .col_expr(feedback_file::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(feedback_file::Column::Id.eq(update.id));

        if let Some(expected) = update.expected_updated_at {
            query = query.filter(feedback_file::Column::UpdatedAt.eq(expected));
        }

        let result = query.exec(&self.db).await?;
        if result.rows_affected == 0 {
            // Tell a missing row apart from a lost precondition.
            let exists = feedback_file::Entity::find_by_id(update.id)
                .one(&self.db)
                .await?
                .is_some();
            return Err(if exists && update.expected_updated_at.is_some() {
                MetadataError::Stale(update.id)
            } else {
                MetadataError::NotFound(update.id)
            });
        }

        self.get_by_id(update.id).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), MetadataError> {
        let result = feedback_file::Entity::delete_by_id(id)
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(MetadataError::NotFound(id));
        }
        Ok(())
    }

    async fn list_by_owner(
        &self,
        owner_id: i64,
        lab_id: Option<i64>,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<feedback_file::Model>, u64), MetadataError> {
        let mut select =
            feedback_file::Entity::find().filter(feedback_file::Column::OwnerId.eq(owner_id));
        if let Some(lab_id) = lab_id {
            select = select.filter(feedback_file::Column::LabId.eq(lab_id));
        }

        let total = select.clone().count(&self.db).await?;

        let records = select
            .order_by_desc(feedback_file::Column::CreatedAt)
            .order_by_desc(feedback_file::Column::Id)
            .offset(Some(offset))
            .limit(Some(limit))
            .all(&self.db)
            .await?;

        Ok((records, total))
    }
}
