//! Batch import: paginated fetch, dependency ordering and per-record
//! reconciliation with isolated failures.

mod records;
mod source;

use async_trait::async_trait;
use catbridge_core::{AppConfig, CatalogStore, EntityKind, ImportResult};
use catbridge_magento::{SourceError, MAX_PAGES};

use crate::error::{ImportError, ReconcileError};
use crate::reconcile::{EntityReconciler, Outcome, Reconciled};
use crate::slug::DEFAULT_MAX_PROBES;
use crate::upload::extract_description_rows;

pub use source::{CategoryTreeSource, JsonFileSource};

/// Fetches one page (1-based) of source records. An empty page ends the
/// listing.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Vec<T>, SourceError>;
}

/// A source record the importer knows how to validate, order and write.
#[async_trait]
pub trait ImportRecord: Send + Sync + Sized {
    const KIND: EntityKind;

    fn external_id(&self) -> String;

    /// Human-readable name used in ledger messages (name, SKU or code).
    fn label(&self) -> Option<String>;

    /// Checks required fields. `Err` carries the warning for a skipped
    /// record.
    ///
    /// # Errors
    ///
    /// Returns the skip warning when a required field is missing.
    fn validate(&self) -> Result<(), String>;

    /// Reorders a flattened batch so every record comes after the records
    /// it references. Source order is kept by default.
    fn dependency_order(records: Vec<Self>) -> Vec<Self> {
        records
    }

    /// Appends this record, and any records nested inside it, to `out`.
    fn flatten_into(self, out: &mut Vec<Self>) {
        out.push(self);
    }

    async fn reconcile(
        &self,
        reconciler: &mut EntityReconciler<'_>,
    ) -> Result<Reconciled, ReconcileError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSettings {
    pub page_size: u32,
    /// Progress is logged every this many records. Commits are per record
    /// regardless.
    pub progress_batch_size: usize,
    pub max_pages: u32,
    pub slug_max_probes: u32,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            page_size: 50,
            progress_batch_size: 50,
            max_pages: MAX_PAGES,
            slug_max_probes: DEFAULT_MAX_PROBES,
        }
    }
}

impl ImportSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            page_size: config.source_page_size,
            progress_batch_size: config.progress_batch_size,
            max_pages: MAX_PAGES,
            slug_max_probes: config.slug_max_probes,
        }
    }
}

pub struct BatchImporter<'a> {
    store: &'a dyn CatalogStore,
    settings: ImportSettings,
}

impl<'a> BatchImporter<'a> {
    #[must_use]
    pub fn new(store: &'a dyn CatalogStore, settings: ImportSettings) -> Self {
        Self { store, settings }
    }

    /// Pulls every page from `source`, then imports the records.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Source`] if any page fetch fails or the page
    /// cap is hit, and [`ImportError::Store`] if the store becomes
    /// unavailable. Neither returns a partial result.
    pub async fn run<T: ImportRecord>(
        &self,
        source: &dyn PageSource<T>,
    ) -> Result<ImportResult, ImportError> {
        let records = self.fetch_all(source).await?;
        self.import_records(records).await
    }

    /// Pulls pages `1..` until an empty page.
    ///
    /// # Errors
    ///
    /// Returns the first fetch error, or [`SourceError::PaginationLimit`]
    /// after `max_pages` non-empty pages.
    pub async fn fetch_all<T: ImportRecord>(
        &self,
        source: &dyn PageSource<T>,
    ) -> Result<Vec<T>, SourceError> {
        let mut records = Vec::new();
        for page in 1..=self.settings.max_pages {
            let batch = source.fetch_page(page, self.settings.page_size).await?;
            tracing::debug!(kind = %T::KIND, page, count = batch.len(), "fetched page");
            if batch.is_empty() {
                return Ok(records);
            }
            records.extend(batch);
        }
        Err(SourceError::PaginationLimit {
            max_pages: self.settings.max_pages,
        })
    }

    /// Flattens, orders and reconciles `records`, one commit per record.
    ///
    /// Validation failures are skipped with a warning and reconciliation
    /// failures are recorded as errors; neither stops the run.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Store`] if the store becomes unavailable.
    pub async fn import_records<T: ImportRecord>(
        &self,
        records: Vec<T>,
    ) -> Result<ImportResult, ImportError> {
        let mut flat = Vec::with_capacity(records.len());
        for record in records {
            record.flatten_into(&mut flat);
        }
        let flat = T::dependency_order(flat);

        let total = flat.len();
        let progress_every = self.settings.progress_batch_size.max(1);
        let mut reconciler = EntityReconciler::new(self.store, self.settings.slug_max_probes);
        let mut result = ImportResult::default();

        tracing::info!(kind = %T::KIND, total, "import started");

        for (index, record) in flat.iter().enumerate() {
            let external_id = record.external_id();
            let label = record.label();

            if let Err(warning) = record.validate() {
                tracing::warn!(kind = %T::KIND, external_id = %external_id, %warning, "record skipped");
                result.record_skipped(T::KIND, external_id, label, warning);
            } else {
                match record.reconcile(&mut reconciler).await {
                    Ok(reconciled) => {
                        apply_reconciled(&mut result, T::KIND, external_id, label, reconciled);
                    }
                    Err(ReconcileError::Store(e)) if e.is_fatal() => {
                        tracing::error!(
                            kind = %T::KIND,
                            external_id = %external_id,
                            error = %e,
                            "store unavailable; aborting import"
                        );
                        return Err(ImportError::Store(e));
                    }
                    Err(e) => {
                        let message = format!(
                            "Error processing {} (external id {external_id}): {e}",
                            label.as_deref().unwrap_or("<unnamed>")
                        );
                        tracing::warn!(kind = %T::KIND, external_id = %external_id, error = %e, "record failed");
                        result.record_failed(T::KIND, external_id, label, message);
                    }
                }
            }

            let done = index + 1;
            if done % progress_every == 0 || done == total {
                tracing::info!(
                    kind = %T::KIND,
                    done,
                    total,
                    processed = result.processed,
                    skipped = result.skipped,
                    errors = result.errors.len(),
                    "import progress"
                );
            }
        }

        Ok(result)
    }

    /// Extracts description rows from an uploaded CSV or ZIP and applies
    /// them.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Upload`] if the upload is unusable as a whole,
    /// and [`ImportError::Store`] if the store becomes unavailable.
    pub async fn import_description_upload(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<ImportResult, ImportError> {
        let rows = extract_description_rows(file_name, bytes)?;
        tracing::info!(file_name, rows = rows.len(), "description upload accepted");
        self.import_records(rows).await
    }
}

fn apply_reconciled(
    result: &mut ImportResult,
    kind: EntityKind,
    external_id: String,
    label: Option<String>,
    reconciled: Reconciled,
) {
    for warning in reconciled.warnings {
        tracing::warn!(kind = %kind, external_id = %external_id, %warning, "record warning");
        result.warn(warning);
    }
    match reconciled.outcome {
        Outcome::Created(id) => result.record_processed(kind, external_id, label, id, true),
        Outcome::Updated(id) => result.record_processed(kind, external_id, label, id, false),
        Outcome::Skipped(reason) => {
            tracing::warn!(kind = %kind, external_id = %external_id, warning = %reason, "record skipped");
            result.record_skipped(kind, external_id, label, reason);
        }
    }
}

#[cfg(test)]
#[path = "import_test.rs"]
mod tests;
