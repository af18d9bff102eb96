//! Database operations for `products` and `product_categories`.

use catbridge_core::{NewProduct, ProductRecord, ProductUpdate};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

/// A live (non-deleted) row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub external_id: Option<String>,
    pub sku: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    /// `enabled` or `disabled`.
    pub status: String,
}

impl From<ProductRow> for ProductRecord {
    fn from(row: ProductRow) -> Self {
        ProductRecord {
            id: row.id,
            external_id: row.external_id,
            sku: row.sku,
            name: row.name,
            slug: row.slug,
            description: row.description,
            price: row.price,
            status: row.status,
        }
    }
}

/// Looks up a live product by SKU.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_product_by_sku(pool: &PgPool, sku: &str) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "SELECT id, external_id, sku, name, slug, description, price, status \
         FROM products \
         WHERE sku = $1 AND deleted_at IS NULL",
    )
    .bind(sku)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Inserts a product and returns its new `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, e.g. on a duplicate SKU or
/// slug.
pub async fn insert_product(pool: &PgPool, product: &NewProduct) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO products \
             (external_id, sku, name, slug, description, price, status, type_id, metadata) \
         VALUES ($1, $2, $3, $4, $5, $6::numeric(12,4), $7, $8, $9::jsonb) \
         RETURNING id",
    )
    .bind(&product.external_id)
    .bind(&product.sku)
    .bind(&product.name)
    .bind(&product.slug)
    .bind(&product.description)
    .bind(product.price)
    .bind(&product.status)
    .bind(&product.type_id)
    .bind(serde_json::Value::Object(product.metadata.clone()))
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Updates the mutable fields of a live product. The slug is left as is and
/// a `None` description keeps the stored one.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no live row has `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_product(pool: &PgPool, id: i64, update: &ProductUpdate) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE products SET \
             external_id = $1, \
             name        = $2, \
             description = COALESCE($3, description), \
             price       = $4::numeric(12,4), \
             status      = $5, \
             type_id     = $6, \
             metadata    = metadata || $7::jsonb, \
             updated_at  = NOW() \
         WHERE id = $8 AND deleted_at IS NULL",
    )
    .bind(&update.external_id)
    .bind(&update.name)
    .bind(&update.description)
    .bind(update.price)
    .bind(&update.status)
    .bind(&update.type_id)
    .bind(serde_json::Value::Object(update.metadata.clone()))
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Replaces a product's description.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no live row has `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn set_product_description(
    pool: &PgPool,
    id: i64,
    description: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE products SET description = $1, updated_at = NOW() \
         WHERE id = $2 AND deleted_at IS NULL",
    )
    .bind(description)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Links a product to a category. Linking an existing pair is a no-op.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, e.g. when either id does
/// not exist.
pub async fn link_product_category(
    pool: &PgPool,
    product_id: i64,
    category_id: i64,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO product_categories (product_id, category_id) \
         VALUES ($1, $2) \
         ON CONFLICT (product_id, category_id) DO NOTHING",
    )
    .bind(product_id)
    .bind(category_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Whether any product row, deleted or not, already uses `slug`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn product_slug_exists(pool: &PgPool, slug: &str) -> Result<bool, DbError> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE slug = $1)")
            .bind(slug)
            .fetch_one(pool)
            .await?;

    Ok(exists)
}
