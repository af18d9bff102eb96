//! Insert-or-update of single records against the store.
//!
//! A record is matched to an existing row by its natural key (external id
//! for categories, SKU for products, code for attributes). A match is
//! updated in place and keeps its id and slug; a miss gets a fresh slug and
//! is inserted with the external id stamped into the row.

use std::collections::HashMap;

use catbridge_core::{
    CatalogStore, CategoryUpdate, Metadata, NewAttribute, NewCategory, NewProduct,
    ProductUpdate, SlugScope,
};
use rust_decimal::Decimal;

use crate::error::ReconcileError;
use crate::slug::SlugAllocator;

/// A category to be written, already translated out of the source format.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryPayload {
    pub external_id: String,
    pub name: String,
    /// External id of the parent; `None` for a root.
    pub parent_external_id: Option<String>,
    pub rank: Option<i32>,
    pub level: Option<i32>,
    pub is_active: bool,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductPayload {
    pub external_id: String,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub status: String,
    pub type_id: Option<String>,
    pub metadata: Metadata,
    pub category_external_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created(i64),
    Updated(i64),
    /// Nothing was written; the reason becomes a ledger warning.
    Skipped(String),
}

/// Result of reconciling one record. `warnings` carry problems that did
/// not stop the write, e.g. a category link that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub outcome: Outcome,
    pub warnings: Vec<String>,
}

impl Reconciled {
    fn created(id: i64) -> Self {
        Self {
            outcome: Outcome::Created(id),
            warnings: Vec::new(),
        }
    }

    fn updated(id: i64) -> Self {
        Self {
            outcome: Outcome::Updated(id),
            warnings: Vec::new(),
        }
    }

    fn skipped(reason: String) -> Self {
        Self {
            outcome: Outcome::Skipped(reason),
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn local_id(&self) -> Option<i64> {
        match self.outcome {
            Outcome::Created(id) | Outcome::Updated(id) => Some(id),
            Outcome::Skipped(_) => None,
        }
    }
}

/// Reconciles records one at a time, remembering the local id of every
/// category it has seen so children can be attached to parents written
/// earlier in the same run.
pub struct EntityReconciler<'a> {
    store: &'a dyn CatalogStore,
    slugs: SlugAllocator<'a>,
    category_ids: HashMap<String, i64>,
}

impl<'a> EntityReconciler<'a> {
    #[must_use]
    pub fn new(store: &'a dyn CatalogStore, slug_max_probes: u32) -> Self {
        Self {
            store,
            slugs: SlugAllocator::new(store, slug_max_probes),
            category_ids: HashMap::new(),
        }
    }

    /// Local id for an external category id, from this run's map or, failing
    /// that, from the store.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Store`] if the lookup fails.
    pub async fn local_category_id(
        &mut self,
        external_id: &str,
    ) -> Result<Option<i64>, ReconcileError> {
        if let Some(id) = self.category_ids.get(external_id) {
            return Ok(Some(*id));
        }
        let found = self
            .store
            .find_category_by_external_id(external_id)
            .await?
            .map(|c| c.id);
        if let Some(id) = found {
            self.category_ids.insert(external_id.to_string(), id);
        }
        Ok(found)
    }

    /// # Errors
    ///
    /// Returns [`ReconcileError::MissingParent`] if the parent has not been
    /// written yet, or [`ReconcileError::Store`] if a store call fails.
    pub async fn reconcile_category(
        &mut self,
        payload: &CategoryPayload,
    ) -> Result<Reconciled, ReconcileError> {
        let parent_id = match payload.parent_external_id.as_deref() {
            None => None,
            Some(parent) => Some(
                self.local_category_id(parent)
                    .await?
                    .ok_or_else(|| ReconcileError::MissingParent(parent.to_string()))?,
            ),
        };

        let existing = self
            .store
            .find_category_by_external_id(&payload.external_id)
            .await?;

        let reconciled = if let Some(existing) = existing {
            let update = CategoryUpdate {
                name: payload.name.clone(),
                parent_id,
                rank: payload.rank,
                level: payload.level,
                is_active: payload.is_active,
                metadata: payload.metadata.clone(),
            };
            self.store.update_category(existing.id, &update).await?;
            Reconciled::updated(existing.id)
        } else {
            let handle = self
                .slugs
                .allocate(SlugScope::Category, &payload.name, &payload.external_id)
                .await?;
            let category = NewCategory {
                external_id: payload.external_id.clone(),
                name: payload.name.clone(),
                handle,
                parent_id,
                rank: payload.rank,
                level: payload.level,
                is_active: payload.is_active,
                metadata: payload.metadata.clone(),
            };
            Reconciled::created(self.store.insert_category(&category).await?)
        };

        if let Some(id) = reconciled.local_id() {
            self.category_ids.insert(payload.external_id.clone(), id);
        }
        Ok(reconciled)
    }

    /// Writes the product, then links it to every category that resolves.
    /// Links to unknown categories, or links the store refuses, become
    /// warnings.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Store`] if the product write fails or the
    /// store becomes unavailable while linking.
    pub async fn reconcile_product(
        &mut self,
        payload: &ProductPayload,
    ) -> Result<Reconciled, ReconcileError> {
        let existing = self.store.find_product_by_sku(&payload.sku).await?;

        let mut reconciled = if let Some(existing) = existing {
            let update = ProductUpdate {
                external_id: payload.external_id.clone(),
                name: payload.name.clone(),
                description: payload.description.clone(),
                price: payload.price,
                status: payload.status.clone(),
                type_id: payload.type_id.clone(),
                metadata: payload.metadata.clone(),
            };
            self.store.update_product(existing.id, &update).await?;
            Reconciled::updated(existing.id)
        } else {
            let slug = self
                .slugs
                .allocate(SlugScope::Product, &payload.name, &payload.sku)
                .await?;
            let product = NewProduct {
                external_id: payload.external_id.clone(),
                sku: payload.sku.clone(),
                name: payload.name.clone(),
                slug,
                description: payload.description.clone(),
                price: payload.price,
                status: payload.status.clone(),
                type_id: payload.type_id.clone(),
                metadata: payload.metadata.clone(),
            };
            Reconciled::created(self.store.insert_product(&product).await?)
        };

        let Some(product_id) = reconciled.local_id() else {
            return Ok(reconciled);
        };

        for category_external_id in &payload.category_external_ids {
            let Some(category_id) = self.local_category_id(category_external_id).await? else {
                reconciled.warnings.push(format!(
                    "Product {}: category with external id {category_external_id} not found; link skipped",
                    payload.sku
                ));
                continue;
            };
            match self
                .store
                .link_product_category(product_id, category_id)
                .await
            {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => reconciled.warnings.push(format!(
                    "Product {}: link to category {category_external_id} failed: {e}",
                    payload.sku
                )),
            }
        }

        Ok(reconciled)
    }

    /// # Errors
    ///
    /// Returns [`ReconcileError::Store`] if a store call fails.
    pub async fn reconcile_attribute(
        &mut self,
        attribute: &NewAttribute,
    ) -> Result<Reconciled, ReconcileError> {
        match self.store.find_attribute_by_code(&attribute.code).await? {
            Some(existing) => {
                self.store.update_attribute(existing.id, attribute).await?;
                Ok(Reconciled::updated(existing.id))
            }
            None => Ok(Reconciled::created(
                self.store.insert_attribute(attribute).await?,
            )),
        }
    }

    /// Replaces the description of the product with this SKU. An unknown
    /// SKU is skipped, never created.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Store`] if a store call fails.
    pub async fn apply_description(
        &mut self,
        sku: &str,
        description: &str,
    ) -> Result<Reconciled, ReconcileError> {
        let Some(product) = self.store.find_product_by_sku(sku).await? else {
            return Ok(Reconciled::skipped(format!(
                "Description for unknown SKU {sku} skipped"
            )));
        };
        self.store
            .set_product_description(product.id, description)
            .await?;
        Ok(Reconciled::updated(product.id))
    }
}
