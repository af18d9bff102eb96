//! Database operations for `categories`.

use catbridge_core::{CategoryRecord, CategoryUpdate, NewCategory};
use sqlx::PgPool;

use crate::{metadata_from_json, DbError};

/// A live (non-deleted) row from the `categories` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: i64,
    pub external_id: Option<String>,
    pub name: String,
    pub parent_id: Option<i64>,
    pub handle: String,
    pub rank: Option<i32>,
    pub level: Option<i32>,
    pub is_active: bool,
    pub metadata: serde_json::Value,
}

impl From<CategoryRow> for CategoryRecord {
    fn from(row: CategoryRow) -> Self {
        CategoryRecord {
            id: row.id,
            external_id: row.external_id,
            name: row.name,
            parent_id: row.parent_id,
            handle: Some(row.handle),
            rank: row.rank,
            level: row.level,
            is_active: row.is_active,
            metadata: metadata_from_json(row.metadata),
        }
    }
}

const CATEGORY_COLUMNS: &str =
    "id, external_id, name, parent_id, handle, rank, level, is_active, metadata";

/// Looks up a live category by the external key stamped at insert time.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_category_by_external_id(
    pool: &PgPool,
    external_id: &str,
) -> Result<Option<CategoryRow>, DbError> {
    let row = sqlx::query_as::<_, CategoryRow>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories \
         WHERE external_id = $1 AND deleted_at IS NULL"
    ))
    .bind(external_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Inserts a category and returns its new `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, e.g. on a duplicate
/// handle or external id.
pub async fn insert_category(pool: &PgPool, category: &NewCategory) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO categories \
             (external_id, name, parent_id, handle, rank, level, is_active, metadata) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8::jsonb) \
         RETURNING id",
    )
    .bind(&category.external_id)
    .bind(&category.name)
    .bind(category.parent_id)
    .bind(&category.handle)
    .bind(category.rank)
    .bind(category.level)
    .bind(category.is_active)
    .bind(serde_json::Value::Object(category.metadata.clone()))
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Updates the mutable fields of a live category. The handle is left as is;
/// metadata is merged over the stored object.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no live row has `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_category(
    pool: &PgPool,
    id: i64,
    update: &CategoryUpdate,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE categories SET \
             name       = $1, \
             parent_id  = $2, \
             rank       = $3, \
             level      = $4, \
             is_active  = $5, \
             metadata   = metadata || $6::jsonb, \
             updated_at = NOW() \
         WHERE id = $7 AND deleted_at IS NULL",
    )
    .bind(&update.name)
    .bind(update.parent_id)
    .bind(update.rank)
    .bind(update.level)
    .bind(update.is_active)
    .bind(serde_json::Value::Object(update.metadata.clone()))
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Returns every live category ordered by `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_categories(pool: &PgPool) -> Result<Vec<CategoryRow>, DbError> {
    let rows = sqlx::query_as::<_, CategoryRow>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories \
         WHERE deleted_at IS NULL \
         ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Whether any category row, deleted or not, already uses `handle`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn category_handle_exists(pool: &PgPool, handle: &str) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM categories WHERE handle = $1)",
    )
    .bind(handle)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}
