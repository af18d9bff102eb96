use catbridge_core::AccessMapping;
use sqlx::PgPool;

use crate::DbError;

/// Upsert access mappings from the access file into the database.
///
/// Returns the number of mappings written. All upserts run inside a single
/// transaction; if any fails the whole batch is rolled back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_access_mappings(
    pool: &PgPool,
    mappings: &[AccessMapping],
) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for mapping in mappings {
        let brand_ids: Vec<&str> = mapping.brand_ids.iter().map(String::as_str).collect();

        sqlx::query(
            "INSERT INTO access_mappings (access_key, brand_ids) \
             VALUES ($1, $2) \
             ON CONFLICT (access_key) DO UPDATE SET \
                 brand_ids  = EXCLUDED.brand_ids, \
                 updated_at = NOW()",
        )
        .bind(&mapping.access_key)
        .bind(&brand_ids)
        .execute(&mut *tx)
        .await?;

        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}
