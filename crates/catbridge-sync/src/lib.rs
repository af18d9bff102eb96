//! Catalog synchronization and category-tree resolution engines.
//!
//! The import side pulls paginated Magento data through a [`PageSource`],
//! orders it parents-first and reconciles each record against a
//! [`catbridge_core::CatalogStore`]. The read side rebuilds the category
//! tree from flat rows, prunes it to an access key's brand set and renders
//! it in the legacy Magento shape.
//!
//! Everything here is written against the store trait; the same code runs
//! against Postgres and against [`MemoryCatalogStore`].

pub mod error;
pub mod export;
pub mod filter;
pub mod import;
pub mod memory;
pub mod reconcile;
pub mod resolver;
pub mod slug;
pub mod tree;
pub mod upload;

pub use error::{ImportError, ReconcileError, ResolveError, UploadError};
pub use export::{CatalogExportFormatter, LegacyCategory};
pub use filter::BrandRestrictionFilter;
pub use import::{
    BatchImporter, CategoryTreeSource, ImportRecord, ImportSettings, JsonFileSource, PageSource,
};
pub use memory::MemoryCatalogStore;
pub use reconcile::{
    CategoryPayload, EntityReconciler, Outcome, ProductPayload, Reconciled,
};
pub use resolver::{CatalogResolver, CatalogView, CategorySummary, ResolvedCatalog};
pub use slug::SlugAllocator;
pub use tree::{CategoryNode, CategoryTree, CategoryTreeBuilder};
pub use upload::{extract_description_rows, DescriptionRow};
