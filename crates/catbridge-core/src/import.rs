//! The per-run result ledger returned by every import.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Category,
    Product,
    Attribute,
    Description,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Category => write!(f, "category"),
            EntityKind::Product => write!(f, "product"),
            EntityKind::Attribute => write!(f, "attribute"),
            EntityKind::Description => write!(f, "description"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Processed,
    Skipped,
    Failed,
}

/// Outcome of a single source record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowOutcome {
    pub kind: EntityKind,
    pub external_id: String,
    pub label: Option<String>,
    pub status: RowStatus,
    pub local_id: Option<i64>,
    pub message: Option<String>,
}

/// Aggregate counters for one import run.
///
/// Counters only ever grow while a run is in progress. Callers treat
/// `processed` together with `errors.len()` as the health signal; a non-empty
/// `errors` list does not make the run a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub categories: usize,
    pub products: usize,
    pub attributes: usize,
    pub descriptions: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub rows: Vec<RowOutcome>,
}

impl ImportResult {
    /// Number of records that failed reconciliation.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    pub fn record_processed(
        &mut self,
        kind: EntityKind,
        external_id: String,
        label: Option<String>,
        local_id: i64,
        created: bool,
    ) {
        self.processed += 1;
        if created {
            self.created += 1;
        } else {
            self.updated += 1;
        }
        match kind {
            EntityKind::Category => self.categories += 1,
            EntityKind::Product => self.products += 1,
            EntityKind::Attribute => self.attributes += 1,
            EntityKind::Description => self.descriptions += 1,
        }
        self.rows.push(RowOutcome {
            kind,
            external_id,
            label,
            status: RowStatus::Processed,
            local_id: Some(local_id),
            message: None,
        });
    }

    pub fn record_skipped(
        &mut self,
        kind: EntityKind,
        external_id: String,
        label: Option<String>,
        warning: String,
    ) {
        self.skipped += 1;
        self.warnings.push(warning.clone());
        self.rows.push(RowOutcome {
            kind,
            external_id,
            label,
            status: RowStatus::Skipped,
            local_id: None,
            message: Some(warning),
        });
    }

    pub fn record_failed(
        &mut self,
        kind: EntityKind,
        external_id: String,
        label: Option<String>,
        error: String,
    ) {
        self.errors.push(error.clone());
        self.rows.push(RowOutcome {
            kind,
            external_id,
            label,
            status: RowStatus::Failed,
            local_id: None,
            message: Some(error),
        });
    }

    /// Adds a warning that is not tied to a skipped record, e.g. an
    /// unresolvable category link on an otherwise imported product.
    pub fn warn(&mut self, warning: String) {
        self.warnings.push(warning);
    }
}
