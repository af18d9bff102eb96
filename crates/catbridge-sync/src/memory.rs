//! In-process [`CatalogStore`].
//!
//! Backs the `memory` store backend, `--dry-run` imports and the engine
//! tests. Mirrors the Postgres constraints that matter to the engines:
//! serial ids per table, unique live external ids and SKUs, slugs unique
//! across live and soft-deleted rows, idempotent product/category links and
//! merged metadata on update.
//!
//! Tests can make single writes fail ([`MemoryCatalogStore::reject_writes_named`])
//! or take the whole store down ([`MemoryCatalogStore::set_unavailable`]).

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use catbridge_core::{
    AccessMapping, AttributeRecord, CatalogStore, CategoryRecord, CategoryUpdate, Metadata,
    NewAttribute, NewCategory, NewProduct, ProductRecord, ProductUpdate, SlugScope, StoreError,
};

#[derive(Debug, Clone)]
struct StoredCategory {
    record: CategoryRecord,
    deleted: bool,
}

#[derive(Debug, Clone)]
struct StoredProduct {
    record: ProductRecord,
    type_id: Option<String>,
    metadata: Metadata,
    deleted: bool,
}

#[derive(Debug, Default)]
struct State {
    categories: BTreeMap<i64, StoredCategory>,
    products: BTreeMap<i64, StoredProduct>,
    attributes: BTreeMap<i64, AttributeRecord>,
    links: BTreeSet<(i64, i64)>,
    access: HashMap<String, AccessMapping>,
    last_category_id: i64,
    last_product_id: i64,
    last_attribute_id: i64,
}

#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    state: Mutex<State>,
    rejected_names: Mutex<HashSet<String>>,
    unavailable: AtomicBool,
}

impl MemoryCatalogStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store pre-loaded with access mappings.
    #[must_use]
    pub fn with_access_mappings(mappings: impl IntoIterator<Item = AccessMapping>) -> Self {
        let store = Self::new();
        if let Ok(mut state) = store.state.lock() {
            for mapping in mappings {
                state.access.insert(mapping.access_key.clone(), mapping);
            }
        }
        store
    }

    /// Makes every insert or update of a category or product with this exact
    /// name fail with [`StoreError::Rejected`].
    pub fn reject_writes_named(&self, name: &str) {
        if let Ok(mut names) = self.rejected_names.lock() {
            names.insert(name.to_string());
        }
    }

    /// While set, every call fails with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Marks a category deleted. It stays in the table, so its handle stays
    /// taken.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Rejected`] if no such category exists.
    pub fn soft_delete_category(&self, id: i64) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let stored = state
            .categories
            .get_mut(&id)
            .ok_or_else(|| StoreError::Rejected(format!("category {id} not found")))?;
        stored.deleted = true;
        Ok(())
    }

    /// Every live product, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the store has been taken down.
    pub fn products(&self) -> Result<Vec<ProductRecord>, StoreError> {
        let state = self.state()?;
        Ok(state
            .products
            .values()
            .filter(|p| !p.deleted)
            .map(|p| p.record.clone())
            .collect())
    }

    /// Every attribute, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the store has been taken down.
    pub fn attributes(&self) -> Result<Vec<AttributeRecord>, StoreError> {
        let state = self.state()?;
        Ok(state.attributes.values().cloned().collect())
    }

    /// Category ids linked to a product, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the store has been taken down.
    pub fn product_category_ids(&self, product_id: i64) -> Result<Vec<i64>, StoreError> {
        let state = self.state()?;
        Ok(state
            .links
            .iter()
            .filter(|(p, _)| *p == product_id)
            .map(|(_, c)| *c)
            .collect())
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "memory store is offline".to_string(),
            ));
        }
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn check_rejected(&self, name: &str) -> Result<(), StoreError> {
        let rejected = self
            .rejected_names
            .lock()
            .map(|names| names.contains(name))
            .unwrap_or(false);
        if rejected {
            return Err(StoreError::Rejected(format!(
                "write rejected for \"{name}\""
            )));
        }
        Ok(())
    }
}

fn merge_metadata(target: &mut Metadata, patch: &Metadata) {
    for (key, value) in patch {
        target.insert(key.clone(), value.clone());
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn find_category_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<CategoryRecord>, StoreError> {
        let state = self.state()?;
        Ok(state
            .categories
            .values()
            .find(|c| !c.deleted && c.record.external_id.as_deref() == Some(external_id))
            .map(|c| c.record.clone()))
    }

    async fn insert_category(&self, category: &NewCategory) -> Result<i64, StoreError> {
        self.check_rejected(&category.name)?;
        let mut state = self.state()?;

        if state
            .categories
            .values()
            .any(|c| c.record.handle.as_deref() == Some(category.handle.as_str()))
        {
            return Err(StoreError::Rejected(format!(
                "duplicate category handle \"{}\"",
                category.handle
            )));
        }
        if state.categories.values().any(|c| {
            !c.deleted && c.record.external_id.as_deref() == Some(category.external_id.as_str())
        }) {
            return Err(StoreError::Rejected(format!(
                "duplicate category external id \"{}\"",
                category.external_id
            )));
        }
        if let Some(parent_id) = category.parent_id {
            if !state.categories.contains_key(&parent_id) {
                return Err(StoreError::Rejected(format!(
                    "parent category {parent_id} does not exist"
                )));
            }
        }

        state.last_category_id += 1;
        let id = state.last_category_id;
        state.categories.insert(
            id,
            StoredCategory {
                record: CategoryRecord {
                    id,
                    external_id: Some(category.external_id.clone()),
                    name: category.name.clone(),
                    parent_id: category.parent_id,
                    handle: Some(category.handle.clone()),
                    rank: category.rank,
                    level: category.level,
                    is_active: category.is_active,
                    metadata: category.metadata.clone(),
                },
                deleted: false,
            },
        );
        Ok(id)
    }

    async fn update_category(&self, id: i64, update: &CategoryUpdate) -> Result<(), StoreError> {
        self.check_rejected(&update.name)?;
        let mut state = self.state()?;
        let stored = state
            .categories
            .get_mut(&id)
            .filter(|c| !c.deleted)
            .ok_or_else(|| StoreError::Rejected(format!("category {id} not found")))?;

        let record = &mut stored.record;
        record.name.clone_from(&update.name);
        record.parent_id = update.parent_id;
        record.rank = update.rank;
        record.level = update.level;
        record.is_active = update.is_active;
        merge_metadata(&mut record.metadata, &update.metadata);
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, StoreError> {
        let state = self.state()?;
        Ok(state
            .categories
            .values()
            .filter(|c| !c.deleted)
            .map(|c| c.record.clone())
            .collect())
    }

    async fn find_product_by_sku(&self, sku: &str) -> Result<Option<ProductRecord>, StoreError> {
        let state = self.state()?;
        Ok(state
            .products
            .values()
            .find(|p| !p.deleted && p.record.sku == sku)
            .map(|p| p.record.clone()))
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<i64, StoreError> {
        self.check_rejected(&product.name)?;
        let mut state = self.state()?;

        if state.products.values().any(|p| p.record.slug == product.slug) {
            return Err(StoreError::Rejected(format!(
                "duplicate product slug \"{}\"",
                product.slug
            )));
        }
        if state
            .products
            .values()
            .any(|p| !p.deleted && p.record.sku == product.sku)
        {
            return Err(StoreError::Rejected(format!(
                "duplicate product sku \"{}\"",
                product.sku
            )));
        }

        state.last_product_id += 1;
        let id = state.last_product_id;
        state.products.insert(
            id,
            StoredProduct {
                record: ProductRecord {
                    id,
                    external_id: Some(product.external_id.clone()),
                    sku: product.sku.clone(),
                    name: product.name.clone(),
                    slug: product.slug.clone(),
                    description: product.description.clone(),
                    price: product.price,
                    status: product.status.clone(),
                },
                type_id: product.type_id.clone(),
                metadata: product.metadata.clone(),
                deleted: false,
            },
        );
        Ok(id)
    }

    async fn update_product(&self, id: i64, update: &ProductUpdate) -> Result<(), StoreError> {
        self.check_rejected(&update.name)?;
        let mut state = self.state()?;
        let stored = state
            .products
            .get_mut(&id)
            .filter(|p| !p.deleted)
            .ok_or_else(|| StoreError::Rejected(format!("product {id} not found")))?;

        let record = &mut stored.record;
        record.external_id = Some(update.external_id.clone());
        record.name.clone_from(&update.name);
        if let Some(description) = &update.description {
            record.description = Some(description.clone());
        }
        record.price = update.price;
        record.status.clone_from(&update.status);
        stored.type_id.clone_from(&update.type_id);
        merge_metadata(&mut stored.metadata, &update.metadata);
        Ok(())
    }

    async fn set_product_description(
        &self,
        id: i64,
        description: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let stored = state
            .products
            .get_mut(&id)
            .filter(|p| !p.deleted)
            .ok_or_else(|| StoreError::Rejected(format!("product {id} not found")))?;
        stored.record.description = Some(description.to_string());
        Ok(())
    }

    async fn link_product_category(
        &self,
        product_id: i64,
        category_id: i64,
    ) -> Result<(), StoreError> {
        let mut state = self.state()?;
        if !state.products.contains_key(&product_id) {
            return Err(StoreError::Rejected(format!(
                "product {product_id} does not exist"
            )));
        }
        if !state.categories.contains_key(&category_id) {
            return Err(StoreError::Rejected(format!(
                "category {category_id} does not exist"
            )));
        }
        state.links.insert((product_id, category_id));
        Ok(())
    }

    async fn find_attribute_by_code(
        &self,
        code: &str,
    ) -> Result<Option<AttributeRecord>, StoreError> {
        let state = self.state()?;
        Ok(state.attributes.values().find(|a| a.code == code).cloned())
    }

    async fn insert_attribute(&self, attribute: &NewAttribute) -> Result<i64, StoreError> {
        let mut state = self.state()?;
        if state.attributes.values().any(|a| a.code == attribute.code) {
            return Err(StoreError::Rejected(format!(
                "duplicate attribute code \"{}\"",
                attribute.code
            )));
        }
        state.last_attribute_id += 1;
        let id = state.last_attribute_id;
        state.attributes.insert(
            id,
            AttributeRecord {
                id,
                code: attribute.code.clone(),
                label: attribute.label.clone(),
                input_type: attribute.input_type.clone(),
                options: attribute.options.clone(),
            },
        );
        Ok(id)
    }

    async fn update_attribute(
        &self,
        id: i64,
        attribute: &NewAttribute,
    ) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let stored = state
            .attributes
            .get_mut(&id)
            .ok_or_else(|| StoreError::Rejected(format!("attribute {id} not found")))?;
        stored.label.clone_from(&attribute.label);
        stored.input_type.clone_from(&attribute.input_type);
        stored.options = attribute.options.clone();
        Ok(())
    }

    async fn slug_exists(&self, scope: SlugScope, slug: &str) -> Result<bool, StoreError> {
        let state = self.state()?;
        let exists = match scope {
            SlugScope::Category => state
                .categories
                .values()
                .any(|c| c.record.handle.as_deref() == Some(slug)),
            SlugScope::Product => state.products.values().any(|p| p.record.slug == slug),
        };
        Ok(exists)
    }

    async fn find_access_mapping(
        &self,
        access_key: &str,
    ) -> Result<Option<AccessMapping>, StoreError> {
        let state = self.state()?;
        Ok(state.access.get(access_key).cloned())
    }
}
