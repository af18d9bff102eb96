use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Brand identifiers an access key may see. An empty set means unrestricted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessMapping {
    pub access_key: String,
    pub brand_ids: BTreeSet<String>,
}

impl AccessMapping {
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.brand_ids.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessEntry {
    pub key: String,
    #[serde(default)]
    pub brand_ids: Vec<String>,
}

impl AccessEntry {
    #[must_use]
    pub fn to_mapping(&self) -> AccessMapping {
        AccessMapping {
            access_key: self.key.trim().to_string(),
            brand_ids: self
                .brand_ids
                .iter()
                .map(|id| id.trim().to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AccessFile {
    pub access: Vec<AccessEntry>,
}

/// Load and validate access mappings from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_access_file(path: &Path) -> Result<AccessFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::AccessFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_access_file(&content)
}

fn parse_access_file(content: &str) -> Result<AccessFile, ConfigError> {
    let file: AccessFile = serde_yaml::from_str(content).map_err(ConfigError::AccessFileParse)?;
    validate_access(&file)?;
    Ok(file)
}

fn validate_access(file: &AccessFile) -> Result<(), ConfigError> {
    let mut seen_keys = HashSet::new();

    for entry in &file.access {
        let key = entry.key.trim();
        if key.is_empty() {
            return Err(ConfigError::Validation(
                "access key must be non-empty".to_string(),
            ));
        }

        if !seen_keys.insert(key.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate access key: '{key}'"
            )));
        }

        if entry.brand_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "access key '{key}' lists a blank brand id"
            )));
        }
    }

    Ok(())
}
