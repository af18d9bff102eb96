//! Restricted catalog views for storefront consumers.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use catbridge_core::CatalogStore;
use serde::{Deserialize, Serialize};

use crate::error::ResolveError;
use crate::export::{CatalogExportFormatter, LegacyCategory};
use crate::filter::BrandRestrictionFilter;
use crate::tree::{CategoryNode, CategoryTreeBuilder};

/// Which shape of the catalog a caller asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogView {
    /// Nested legacy tree; top level unfiltered, descendants restricted.
    All,
    /// Top-level summaries, unrestricted.
    Category,
    /// Every matching node at any depth, flat, sorted by name.
    Brand,
}

impl CatalogView {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CatalogView::All => "all",
            CatalogView::Category => "category",
            CatalogView::Brand => "brand",
        }
    }

    #[must_use]
    pub fn requires_access_id(self) -> bool {
        !matches!(self, CatalogView::Category)
    }
}

impl fmt::Display for CatalogView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CatalogView {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(CatalogView::All),
            "category" => Ok(CatalogView::Category),
            "brand" => Ok(CatalogView::Brand),
            other => Err(ResolveError::UnknownView(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub entity_id: String,
    pub name: String,
    pub image: Option<String>,
    pub url_path: Option<String>,
}

impl From<&CategoryNode> for CategorySummary {
    fn from(node: &CategoryNode) -> Self {
        Self {
            entity_id: node.entity_id.clone(),
            name: node.name.clone(),
            image: node.image.clone(),
            url_path: node.url_path.clone(),
        }
    }
}

/// Serialized as a bare JSON array in either case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResolvedCatalog {
    Categories(Vec<CategorySummary>),
    Legacy(Vec<LegacyCategory>),
}

impl ResolvedCatalog {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ResolvedCatalog::Categories(items) => items.len(),
            ResolvedCatalog::Legacy(items) => items.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct CatalogResolver<'a> {
    store: &'a dyn CatalogStore,
}

impl<'a> CatalogResolver<'a> {
    #[must_use]
    pub fn new(store: &'a dyn CatalogStore) -> Self {
        Self { store }
    }

    /// Builds the requested view from the current store contents.
    ///
    /// A blank `access_id` is treated as absent.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::MissingAccessId`] for `all`/`brand` without an
    ///   access id.
    /// - [`ResolveError::UnknownAccessKey`] if no mapping exists for it.
    /// - [`ResolveError::Store`] if the store cannot be read.
    pub async fn resolve(
        &self,
        view: CatalogView,
        access_id: Option<&str>,
    ) -> Result<ResolvedCatalog, ResolveError> {
        let access_id = access_id.map(str::trim).filter(|s| !s.is_empty());

        let brand_ids = if view.requires_access_id() {
            let key = access_id.ok_or(ResolveError::MissingAccessId(view))?;
            let mapping = self
                .store
                .find_access_mapping(key)
                .await?
                .ok_or_else(|| ResolveError::UnknownAccessKey(key.to_string()))?;
            mapping.brand_ids
        } else {
            BTreeSet::new()
        };

        let tree = CategoryTreeBuilder::new(self.store).build().await?;
        let formatter = CatalogExportFormatter::new(&tree.nodes);
        let filter = BrandRestrictionFilter::new(&brand_ids);

        let resolved = match view {
            CatalogView::Category => ResolvedCatalog::Categories(
                tree.top_level.iter().map(CategorySummary::from).collect(),
            ),
            CatalogView::Brand => ResolvedCatalog::Legacy(
                filter
                    .matching_nodes(&tree)
                    .into_iter()
                    .map(|node| formatter.to_legacy_leaf(node))
                    .collect(),
            ),
            CatalogView::All => ResolvedCatalog::Legacy(
                filter
                    .filter_tree(&tree)
                    .iter()
                    .map(|node| formatter.to_legacy_shape(node))
                    .collect(),
            ),
        };

        tracing::debug!(view = %view, count = resolved.len(), "catalog view resolved");
        Ok(resolved)
    }
}
