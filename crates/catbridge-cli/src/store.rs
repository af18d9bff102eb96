//! Store selection for a single CLI invocation.

use anyhow::Context;
use catbridge_core::{load_access_file, AppConfig, CatalogStore, StoreBackend};
use catbridge_db::PgCatalogStore;
use catbridge_sync::MemoryCatalogStore;

/// The store a command runs against.
pub(crate) enum Backend {
    Postgres(PgCatalogStore),
    Memory(MemoryCatalogStore),
}

impl Backend {
    /// Opens the configured backend, or an in-memory one when `dry_run` is
    /// set.
    ///
    /// In-memory stores are pre-loaded with the access file, when one
    /// exists, so restricted views resolve without a database.
    pub(crate) async fn open(config: &AppConfig, dry_run: bool) -> anyhow::Result<Self> {
        if dry_run || config.store_backend == StoreBackend::Memory {
            let mappings = if config.access_path.exists() {
                load_access_file(&config.access_path)?
                    .access
                    .iter()
                    .map(catbridge_core::AccessEntry::to_mapping)
                    .collect()
            } else {
                Vec::new()
            };
            tracing::info!(
                access_mappings = mappings.len(),
                dry_run,
                "using in-memory catalog store"
            );
            return Ok(Backend::Memory(MemoryCatalogStore::with_access_mappings(
                mappings,
            )));
        }

        let pool = connect(config).await?;
        Ok(Backend::Postgres(PgCatalogStore::new(pool)))
    }

    pub(crate) fn store(&self) -> &dyn CatalogStore {
        match self {
            Backend::Postgres(store) => store,
            Backend::Memory(store) => store,
        }
    }

    pub(crate) fn pool(&self) -> Option<&sqlx::PgPool> {
        match self {
            Backend::Postgres(store) => Some(store.pool()),
            Backend::Memory(_) => None,
        }
    }
}

/// Connects to Postgres using the pool settings from `config`.
pub(crate) async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is required for the postgres store backend")?;
    let pool_config = catbridge_db::PoolConfig::from_app_config(config);
    let pool = catbridge_db::connect_pool(database_url, pool_config)
        .await
        .context("failed to connect to database")?;
    Ok(pool)
}
