//! Error types. A [`ReconcileError`] stays with its record; an [`ImportError`]
//! aborts the whole run.

use catbridge_core::StoreError;
use catbridge_magento::SourceError;
use thiserror::Error;

use crate::resolver::CatalogView;

/// Failure to reconcile one record.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("missing parent mapping for external parent id {0}")]
    MissingParent(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReconcileError {
    /// Whether the failure should abort the whole run rather than just the
    /// record at hand.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, ReconcileError::Store(e) if e.is_fatal())
    }
}

/// A failure that aborts an import run. Per-record problems never surface
/// here; they are accumulated in the run's [`catbridge_core::ImportResult`].
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("source fetch failed: {0}")]
    Source(#[from] SourceError),

    #[error("target store failed: {0}")]
    Store(#[from] StoreError),

    #[error("upload rejected: {0}")]
    Upload(#[from] UploadError),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("access id is required for the {0} view")]
    MissingAccessId(CatalogView),

    #[error("unknown access key: {0}")]
    UnknownAccessKey(String),

    #[error("unknown category type \"{0}\"; expected all, category or brand")]
    UnknownView(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Problems with an uploaded description file as a whole.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload is empty")]
    Empty,

    #[error("invalid ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("failed to read {file} from archive: {source}")]
    ArchiveEntry {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("archive contains no CSV files")]
    NoCsvInArchive,

    #[error("{file}: no {column} column (accepted headers: {accepted})")]
    MissingColumn {
        file: String,
        column: &'static str,
        accepted: String,
    },

    #[error("{file}: malformed CSV: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },
}
