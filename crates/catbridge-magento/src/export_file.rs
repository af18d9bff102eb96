//! Reads Magento exports saved to disk.
//!
//! An export file holds either a bare JSON array of records or a captured
//! search response (`{ "items": [...] }`).

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::SourceError;
use crate::page::PageBody;

/// Reads every record from a JSON export file.
///
/// # Errors
///
/// Returns [`SourceError::FileIo`] if the file cannot be read, or
/// [`SourceError::Deserialize`] if it is not a page body of `T`.
pub fn read_export_file<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, SourceError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SourceError::FileIo {
        path: path.display().to_string(),
        source,
    })?;
    let body: PageBody<T> =
        serde_json::from_str(&raw).map_err(|source| SourceError::Deserialize {
            context: path.display().to_string(),
            source,
        })?;
    Ok(body.into_items())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::types::MagentoCategory;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "catbridge-export-{}-{name}",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write temp file");
        path
    }

    #[test]
    fn reads_bare_array_export() {
        let path = write_temp(
            "bare.json",
            r#"[{"id": 1, "parent_id": 0, "name": "Root"}, {"id": 2, "parent_id": 1, "name": "Shoes"}]"#,
        );
        let rows: Vec<MagentoCategory> = read_export_file(&path).expect("read");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].name.as_deref(), Some("Shoes"));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn reads_captured_search_response() {
        let path = write_temp(
            "items.json",
            r#"{"items": [{"id": 7, "name": "Boots"}], "total_count": 1}"#,
        );
        let rows: Vec<MagentoCategory> = read_export_file(&path).expect("read");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, 7);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_file_io_error() {
        let result: Result<Vec<MagentoCategory>, _> =
            read_export_file(Path::new("/nonexistent/catbridge/export.json"));
        assert!(matches!(result, Err(SourceError::FileIo { .. })));
    }

    #[test]
    fn malformed_file_is_deserialize_error() {
        let path = write_temp("bad.json", "{ not json");
        let result: Result<Vec<MagentoCategory>, _> = read_export_file(&path);
        assert!(matches!(result, Err(SourceError::Deserialize { .. })));
        let _ = std::fs::remove_file(path);
    }
}
