//! [`CatalogStore`] backed by Postgres.

use async_trait::async_trait;
use catbridge_core::{
    AccessMapping, AttributeRecord, CatalogStore, CategoryRecord, CategoryUpdate, NewAttribute,
    NewCategory, NewProduct, ProductRecord, ProductUpdate, SlugScope, StoreError,
};
use sqlx::PgPool;

use crate::{access, attributes, categories, products};

/// Postgres implementation of [`CatalogStore`]. Each call runs in its own
/// implicit transaction.
#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn find_category_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<CategoryRecord>, StoreError> {
        Ok(categories::find_category_by_external_id(&self.pool, external_id)
            .await?
            .map(CategoryRecord::from))
    }

    async fn insert_category(&self, category: &NewCategory) -> Result<i64, StoreError> {
        Ok(categories::insert_category(&self.pool, category).await?)
    }

    async fn update_category(&self, id: i64, update: &CategoryUpdate) -> Result<(), StoreError> {
        Ok(categories::update_category(&self.pool, id, update).await?)
    }

    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, StoreError> {
        Ok(categories::list_categories(&self.pool)
            .await?
            .into_iter()
            .map(CategoryRecord::from)
            .collect())
    }

    async fn find_product_by_sku(&self, sku: &str) -> Result<Option<ProductRecord>, StoreError> {
        Ok(products::find_product_by_sku(&self.pool, sku)
            .await?
            .map(ProductRecord::from))
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<i64, StoreError> {
        Ok(products::insert_product(&self.pool, product).await?)
    }

    async fn update_product(&self, id: i64, update: &ProductUpdate) -> Result<(), StoreError> {
        Ok(products::update_product(&self.pool, id, update).await?)
    }

    async fn set_product_description(
        &self,
        id: i64,
        description: &str,
    ) -> Result<(), StoreError> {
        Ok(products::set_product_description(&self.pool, id, description).await?)
    }

    async fn link_product_category(
        &self,
        product_id: i64,
        category_id: i64,
    ) -> Result<(), StoreError> {
        Ok(products::link_product_category(&self.pool, product_id, category_id).await?)
    }

    async fn find_attribute_by_code(
        &self,
        code: &str,
    ) -> Result<Option<AttributeRecord>, StoreError> {
        Ok(attributes::find_attribute_by_code(&self.pool, code)
            .await?
            .map(AttributeRecord::from))
    }

    async fn insert_attribute(&self, attribute: &NewAttribute) -> Result<i64, StoreError> {
        Ok(attributes::insert_attribute(&self.pool, attribute).await?)
    }

    async fn update_attribute(
        &self,
        id: i64,
        attribute: &NewAttribute,
    ) -> Result<(), StoreError> {
        Ok(attributes::update_attribute(&self.pool, id, attribute).await?)
    }

    async fn slug_exists(&self, scope: SlugScope, slug: &str) -> Result<bool, StoreError> {
        let exists = match scope {
            SlugScope::Category => categories::category_handle_exists(&self.pool, slug).await?,
            SlugScope::Product => products::product_slug_exists(&self.pool, slug).await?,
        };
        Ok(exists)
    }

    async fn find_access_mapping(
        &self,
        access_key: &str,
    ) -> Result<Option<AccessMapping>, StoreError> {
        Ok(access::find_access_mapping(&self.pool, access_key)
            .await?
            .map(AccessMapping::from))
    }
}
