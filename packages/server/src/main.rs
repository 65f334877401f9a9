use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use common::config::StorageBackend;
use common::storage::BlobStore;
use common::storage::filesystem::FilesystemBlobStore;
use common::storage::s3::S3BlobStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

use feedback_server::config::AppConfig;
use feedback_server::database::{ensure_indexes, init_db};
use feedback_server::repository::SeaOrmMetadataStore;
use feedback_server::service::FeedbackCoordinator;
use feedback_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = init_db(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    ensure_indexes(&db).await?;

    let blobs: Arc<dyn BlobStore> = match config.storage.backend {
        StorageBackend::Filesystem => {
            info!(root = %config.storage.filesystem.root.display(), "Using filesystem blob store");
            Arc::new(FilesystemBlobStore::new(
                config.storage.filesystem.root.clone(),
            ))
        }
        StorageBackend::S3 => {
            info!(
                endpoint = %config.storage.s3.endpoint,
                bucket = %config.storage.s3.bucket,
                "Using S3 blob store"
            );
            Arc::new(S3BlobStore::new(&config.storage.s3)?)
        }
    };
    blobs
        .ensure_container()
        .await
        .context("Failed to prepare blob storage")?;

    let coordinator = FeedbackCoordinator::new(Arc::new(SeaOrmMetadataStore::new(db)), blobs);
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let app = feedback_server::build_router(AppState::new(config, Arc::new(coordinator)));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running at http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
