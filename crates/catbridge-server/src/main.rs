mod api;
mod middleware;

use std::sync::Arc;

use catbridge_core::{load_access_file, AccessEntry, AppConfig, CatalogStore, StoreBackend};
use catbridge_db::PgCatalogStore;
use catbridge_sync::{ImportSettings, MemoryCatalogStore};
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState, MAX_UPLOAD_BYTES},
    middleware::ApiKeys,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = catbridge_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let (store, pool) = open_store(&config).await?;
    let keys = ApiKeys::configured(&config.api_keys, &config.env)?;
    let app = build_app(
        AppState {
            store,
            pool,
            import_settings: ImportSettings::from_app_config(&config),
            max_upload_bytes: MAX_UPLOAD_BYTES,
        },
        keys,
    );

    tracing::info!(
        bind_addr = %config.bind_addr,
        backend = %config.store_backend,
        env = %config.env,
        "catbridge server listening"
    );
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn open_store(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn CatalogStore>, Option<PgPool>)> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for postgres"))?;
            let pool_config = catbridge_db::PoolConfig::from_app_config(config);
            let pool = catbridge_db::connect_pool(database_url, pool_config).await?;
            catbridge_db::run_migrations(&pool).await?;
            let store: Arc<dyn CatalogStore> = Arc::new(PgCatalogStore::new(pool.clone()));
            Ok((store, Some(pool)))
        }
        StoreBackend::Memory => {
            let mappings: Vec<_> = if config.access_path.exists() {
                load_access_file(&config.access_path)?
                    .access
                    .iter()
                    .map(AccessEntry::to_mapping)
                    .collect()
            } else {
                tracing::warn!(
                    path = %config.access_path.display(),
                    "access file not found; every restricted view will be rejected"
                );
                Vec::new()
            };
            tracing::warn!("using in-memory catalog store; data is lost on shutdown");
            let store: Arc<dyn CatalogStore> =
                Arc::new(MemoryCatalogStore::with_access_mappings(mappings));
            Ok((store, None))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
