//! Database operations for `attributes`.

use catbridge_core::{AttributeRecord, NewAttribute};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttributeRow {
    pub id: i64,
    pub code: String,
    pub label: Option<String>,
    pub input_type: Option<String>,
    /// JSON array of `{ label, value }` objects.
    pub options: serde_json::Value,
}

impl From<AttributeRow> for AttributeRecord {
    fn from(row: AttributeRow) -> Self {
        AttributeRecord {
            id: row.id,
            code: row.code,
            label: row.label,
            input_type: row.input_type,
            options: row.options,
        }
    }
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_attribute_by_code(
    pool: &PgPool,
    code: &str,
) -> Result<Option<AttributeRow>, DbError> {
    let row = sqlx::query_as::<_, AttributeRow>(
        "SELECT id, code, label, input_type, options FROM attributes WHERE code = $1",
    )
    .bind(code)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_attribute(pool: &PgPool, attribute: &NewAttribute) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO attributes (code, label, input_type, options) \
         VALUES ($1, $2, $3, $4::jsonb) \
         RETURNING id",
    )
    .bind(&attribute.code)
    .bind(&attribute.label)
    .bind(&attribute.input_type)
    .bind(&attribute.options)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Overwrites label, input type and options. The code never changes.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has `id`, or [`DbError::Sqlx`] if
/// the update fails.
pub async fn update_attribute(
    pool: &PgPool,
    id: i64,
    attribute: &NewAttribute,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE attributes SET \
             label      = $1, \
             input_type = $2, \
             options    = $3::jsonb, \
             updated_at = NOW() \
         WHERE id = $4",
    )
    .bind(&attribute.label)
    .bind(&attribute.input_type)
    .bind(&attribute.options)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
