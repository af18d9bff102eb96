//! The storage capability the sync and resolution engines are written
//! against.
//!
//! One implementation exists per backend (Postgres in `catbridge-db`, an
//! in-memory store in `catbridge-sync`). The binaries pick one at startup
//! from [`crate::StoreBackend`].

use async_trait::async_trait;
use thiserror::Error;

use crate::access::AccessMapping;
use crate::catalog::{
    AttributeRecord, CategoryRecord, CategoryUpdate, NewAttribute, NewCategory, NewProduct,
    ProductRecord, ProductUpdate,
};
use crate::slug::SlugScope;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store cannot be reached at all. Aborts an import run.
    #[error("catalog store unavailable: {0}")]
    Unavailable(String),

    /// The store refused a single write or read, e.g. a constraint
    /// violation. Recorded against the offending record only.
    #[error("{0}")]
    Rejected(String),
}

impl StoreError {
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    // -- categories ---------------------------------------------------------

    async fn find_category_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<CategoryRecord>, StoreError>;

    async fn insert_category(&self, category: &NewCategory) -> Result<i64, StoreError>;

    async fn update_category(&self, id: i64, update: &CategoryUpdate) -> Result<(), StoreError>;

    /// All non-deleted categories, in no particular order.
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, StoreError>;

    // -- products -----------------------------------------------------------

    async fn find_product_by_sku(&self, sku: &str) -> Result<Option<ProductRecord>, StoreError>;

    async fn insert_product(&self, product: &NewProduct) -> Result<i64, StoreError>;

    async fn update_product(&self, id: i64, update: &ProductUpdate) -> Result<(), StoreError>;

    async fn set_product_description(&self, id: i64, description: &str)
        -> Result<(), StoreError>;

    /// Idempotent: linking an already-linked pair is not an error.
    async fn link_product_category(
        &self,
        product_id: i64,
        category_id: i64,
    ) -> Result<(), StoreError>;

    // -- attributes ---------------------------------------------------------

    async fn find_attribute_by_code(
        &self,
        code: &str,
    ) -> Result<Option<AttributeRecord>, StoreError>;

    async fn insert_attribute(&self, attribute: &NewAttribute) -> Result<i64, StoreError>;

    async fn update_attribute(&self, id: i64, attribute: &NewAttribute)
        -> Result<(), StoreError>;

    // -- slugs --------------------------------------------------------------

    /// Whether any row in the scope's table already uses `slug`, deleted
    /// rows included.
    async fn slug_exists(&self, scope: SlugScope, slug: &str) -> Result<bool, StoreError>;

    // -- access -------------------------------------------------------------

    async fn find_access_mapping(
        &self,
        access_key: &str,
    ) -> Result<Option<AccessMapping>, StoreError>;
}
