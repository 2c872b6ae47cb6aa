use std::sync::Arc;

use anyhow::Context;
use tag_products::{
    app::{
        self,
        product::{AppState, MemoryProductStore, ProductStore},
    },
    config::{self, AppConfig, StorageBackend},
    infrastructure::logger::Logger,
};
use tokio::net::TcpListener;
use tracing::info;

async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn ProductStore>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory product store");
            Ok(Arc::new(MemoryProductStore::new()))
        }
        #[cfg(feature = "database")]
        StorageBackend::Postgres => {
            use tag_products::infrastructure::database::{DatabaseManager, PgProductStore};

            let db = DatabaseManager::new(&config.database)
                .await
                .context("failed to connect to database")?;
            db.init_schema().await.context("failed to create schema")?;
            Ok(Arc::new(PgProductStore::new(db.get_pool().clone())))
        }
        #[cfg(not(feature = "database"))]
        StorageBackend::Postgres => {
            anyhow::bail!("postgres storage requires the `database` feature")
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::load_config()?;
    let _log_guard = Logger::init(&config.logging)?;

    info!("Starting TagProducts server...");

    let store = build_store(&config).await?;
    let state = AppState::new(store, &config);
    let app = app::router(state, &config);

    let listener = TcpListener::bind((config.server.bind_address.as_str(), config.server.port))
        .await
        .with_context(|| {
            format!(
                "failed to bind {}:{}",
                config.server.bind_address, config.server.port
            )
        })?;
    let addr = listener.local_addr()?;

    info!("🚀 Server running on http://{}", addr);
    info!("   GET    /api/v1/up                - Health check");
    info!("   GET    /api/v1/products          - List products (?page=1&limit=10)");
    info!("   GET    /api/v1/products/:id      - Get product by id");
    info!("   POST   /api/v1/products          - Create product");
    info!("   POST   /api/v1/products/import   - Import products from CSV (multipart field `file`)");

    axum::serve(listener, app).await?;

    Ok(())
}
