pub mod access;
pub mod app_config;
pub mod catalog;
pub mod config;
pub mod import;
pub mod metadata;
pub mod slug;
pub mod store;

use thiserror::Error;

pub use access::{load_access_file, AccessEntry, AccessFile, AccessMapping};
pub use app_config::{AppConfig, Environment, StoreBackend};
pub use catalog::{
    AttributeRecord, CategoryRecord, CategoryUpdate, NewAttribute, NewCategory, NewProduct,
    ProductRecord, ProductUpdate,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use import::{EntityKind, ImportResult, RowOutcome, RowStatus};
pub use metadata::{select_metadata_string, Metadata, ENTITY_ID_METADATA_KEYS};
pub use slug::{slugify, SlugScope};
pub use store::{CatalogStore, StoreError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read access file {path}: {source}")]
    AccessFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse access file: {0}")]
    AccessFileParse(#[source] serde_yaml::Error),

    #[error("access configuration invalid: {0}")]
    Validation(String),
}
