use catbridge_core::{AppConfig, StoreError};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/catbridge-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    #[error("import run {id} is not in expected status '{expected_status}'")]
    InvalidImportRunTransition {
        id: i64,
        expected_status: &'static str,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Splits database failures into the two classes the import engine acts on.
///
/// Anything the server rejected for one statement (constraint violations,
/// bad data, a missing row) is [`StoreError::Rejected`] and only fails the
/// record at hand. Pool exhaustion, I/O and protocol failures mean the
/// database is gone and become [`StoreError::Unavailable`].
impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound | DbError::InvalidImportRunTransition { .. } => {
                StoreError::Rejected(err.to_string())
            }
            DbError::Sqlx(
                ref e @ (sqlx::Error::Database(_)
                | sqlx::Error::RowNotFound
                | sqlx::Error::Decode(_)
                | sqlx::Error::ColumnDecode { .. }
                | sqlx::Error::ColumnNotFound(_)
                | sqlx::Error::TypeNotFound { .. }
                | sqlx::Error::Encode(_)),
            ) => StoreError::Rejected(e.to_string()),
            DbError::Sqlx(_) | DbError::Migration(_) => {
                StoreError::Unavailable(err.to_string())
            }
        }
    }
}

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Run all pending migrations against the pool.
///
/// Returns the number of migrations that were applied.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    // _sqlx_migrations does not exist on a fresh database; treat that as zero applied.
    let applied_before: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    MIGRATOR.run(pool).await?;

    let applied_after: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    let delta = (applied_after - applied_before).max(0);
    Ok(usize::try_from(delta).unwrap_or(0))
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// Decodes a `jsonb` column into a metadata map; anything but an object
/// yields an empty map.
pub(crate) fn metadata_from_json(value: serde_json::Value) -> catbridge_core::Metadata {
    match value {
        serde_json::Value::Object(map) => map,
        _ => catbridge_core::Metadata::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_config_has_sane_defaults() {
        let config = PoolConfig::default();

        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.min_connections, DEFAULT_MIN_CONNECTIONS);
        assert_eq!(config.acquire_timeout_secs, DEFAULT_ACQUIRE_TIMEOUT_SECS);
    }

    #[test]
    fn row_level_failures_are_rejections() {
        let err: StoreError = DbError::Sqlx(sqlx::Error::RowNotFound).into();
        assert!(!err.is_fatal());
        let err: StoreError = DbError::NotFound.into();
        assert!(!err.is_fatal());
    }

    #[test]
    fn pool_failures_are_fatal() {
        let err: StoreError = DbError::Sqlx(sqlx::Error::PoolTimedOut).into();
        assert!(err.is_fatal());
        let err: StoreError = DbError::Sqlx(sqlx::Error::PoolClosed).into();
        assert!(err.is_fatal());
    }

    #[test]
    fn non_object_metadata_decodes_empty() {
        assert!(metadata_from_json(serde_json::json!(null)).is_empty());
        let map = metadata_from_json(serde_json::json!({ "magento_entity_id": "7" }));
        assert_eq!(map.len(), 1);
    }
}

pub mod access;
pub mod attributes;
pub mod categories;
pub mod import_runs;
pub mod products;
pub mod seed;
pub mod store;

pub use access::{find_access_mapping, AccessMappingRow};
pub use attributes::{find_attribute_by_code, insert_attribute, update_attribute, AttributeRow};
pub use categories::{
    category_handle_exists, find_category_by_external_id, insert_category, list_categories,
    update_category, CategoryRow,
};
pub use import_runs::{
    complete_import_run, create_import_run, fail_import_run, get_import_run, list_import_runs,
    record_import_run, start_import_run, ImportRunRow,
};
pub use products::{
    find_product_by_sku, insert_product, link_product_category, product_slug_exists,
    set_product_description, update_product, ProductRow,
};
pub use seed::seed_access_mappings;
pub use store::PgCatalogStore;
