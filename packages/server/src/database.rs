use std::time::Duration;

use sea_orm::sea_query::{Index, PostgresQueryBuilder};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tracing::info;

use crate::entity::feedback_file;

pub async fn init_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    // Set connection pool options
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(8))
        .max_lifetime(Duration::from_secs(8))
        .sqlx_logging(true);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("feedback_server::entity::*")
        .sync(&db)
        .await?;

    Ok(db)
}

/// Ensure required database indexes exist.
///
/// Schema sync only creates the table; the listing index is composite, so
/// it is created here on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // SELECT ... FROM feedback_file WHERE owner_id = ? [AND lab_id = ?]
    // ORDER BY created_at DESC
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_feedback_file_owner_lab_created")
        .table(feedback_file::Entity)
        .col(feedback_file::Column::OwnerId)
        .col(feedback_file::Column::LabId)
        .col(feedback_file::Column::CreatedAt)
        .to_string(PostgresQueryBuilder);

    match db.execute_unprepared(&stmt).await {
        Ok(_) => info!("Ensured index idx_feedback_file_owner_lab_created exists"),
        Err(e) => tracing::warn!(
            "Failed to create index idx_feedback_file_owner_lab_created: {}",
            e
        ),
    }

    Ok(())
}
