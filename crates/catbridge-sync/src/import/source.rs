//! [`PageSource`] implementations: the live Magento API and exported files.

use std::path::Path;

use async_trait::async_trait;
use catbridge_core::CatalogStore;
use catbridge_magento::{
    read_export_file, MagentoAttribute, MagentoCategory, MagentoClient, MagentoProduct,
    SourceError,
};
use serde::de::DeserializeOwned;

use super::PageSource;

#[async_trait]
impl PageSource<MagentoCategory> for MagentoClient {
    async fn fetch_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<MagentoCategory>, SourceError> {
        self.fetch_categories_page(page, page_size).await
    }
}

#[async_trait]
impl PageSource<MagentoProduct> for MagentoClient {
    async fn fetch_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<MagentoProduct>, SourceError> {
        self.fetch_products_page(page, page_size).await
    }
}

#[async_trait]
impl PageSource<MagentoAttribute> for MagentoClient {
    async fn fetch_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<MagentoAttribute>, SourceError> {
        self.fetch_attributes_page(page, page_size).await
    }
}

/// Serves the nested `GET /V1/categories` tree as a single page holding the
/// store root. The importer flattens `children_data` and orders it
/// parents-first.
///
/// Magento never includes the root's own parent (the Root Catalog) in the
/// response. Unless that parent is already in the store, the returned root
/// is imported as a top-level category.
pub struct CategoryTreeSource<'a> {
    client: MagentoClient,
    store: &'a dyn CatalogStore,
}

impl<'a> CategoryTreeSource<'a> {
    #[must_use]
    pub fn new(client: MagentoClient, store: &'a dyn CatalogStore) -> Self {
        Self { client, store }
    }

    async fn parent_is_known(&self, parent: i64) -> bool {
        match self
            .store
            .find_category_by_external_id(&parent.to_string())
            .await
        {
            Ok(found) => found.is_some(),
            Err(e) => {
                tracing::warn!(parent, error = %e, "could not look up tree root parent");
                false
            }
        }
    }
}

#[async_trait]
impl<'a> PageSource<MagentoCategory> for CategoryTreeSource<'a> {
    async fn fetch_page(
        &self,
        page: u32,
        _page_size: u32,
    ) -> Result<Vec<MagentoCategory>, SourceError> {
        if page > 1 {
            return Ok(Vec::new());
        }
        let mut root = self.client.fetch_category_tree().await?;
        if let Some(parent) = root.parent_external_id() {
            if !self.parent_is_known(parent).await {
                tracing::debug!(
                    root = root.id,
                    parent,
                    "tree root parent not imported; treating root as top level"
                );
                root.parent_id = None;
            }
        }
        Ok(vec![root])
    }
}

/// Serves an exported JSON file as a single page.
///
/// The file may be a bare array, a captured `{ "items": [...] }` response or
/// a nested category tree; nesting is flattened later by the importer.
#[derive(Debug, Clone)]
pub struct JsonFileSource<T> {
    records: Vec<T>,
}

impl<T: DeserializeOwned> JsonFileSource<T> {
    /// # Errors
    ///
    /// Returns [`SourceError::FileIo`] or [`SourceError::Deserialize`] if
    /// the file cannot be read or parsed.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        Ok(Self {
            records: read_export_file(path)?,
        })
    }
}

impl<T> JsonFileSource<T> {
    #[must_use]
    pub fn from_records(records: Vec<T>) -> Self {
        Self { records }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl<T: Clone + Send + Sync> PageSource<T> for JsonFileSource<T> {
    async fn fetch_page(&self, page: u32, _page_size: u32) -> Result<Vec<T>, SourceError> {
        if page == 1 {
            Ok(self.records.clone())
        } else {
            Ok(Vec::new())
        }
    }
}
