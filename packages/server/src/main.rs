use std::sync::Arc;

use tracing::{Level, info};

use common::storage::FilesystemBlobStore;
use server::config::AppConfig;
use server::database::init_db;
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load()?;

    let db = init_db(&config.database.url).await?;

    let blob_store = FilesystemBlobStore::new(
        config.storage.root_dir.clone(),
        config.storage.max_image_bytes,
    )
    .await?;

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState {
        db,
        blob_store: Arc::new(blob_store),
        config,
    };
    let app = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running at http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
