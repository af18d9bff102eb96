//! Read access to `access_mappings`.

use catbridge_core::AccessMapping;
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccessMappingRow {
    pub access_key: String,
    pub brand_ids: Vec<String>,
}

impl From<AccessMappingRow> for AccessMapping {
    fn from(row: AccessMappingRow) -> Self {
        AccessMapping {
            access_key: row.access_key,
            brand_ids: row.brand_ids.into_iter().collect(),
        }
    }
}

/// Looks up an access key. Keys are matched exactly.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_access_mapping(
    pool: &PgPool,
    access_key: &str,
) -> Result<Option<AccessMappingRow>, DbError> {
    let row = sqlx::query_as::<_, AccessMappingRow>(
        "SELECT access_key, brand_ids FROM access_mappings WHERE access_key = $1",
    )
    .bind(access_key)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
