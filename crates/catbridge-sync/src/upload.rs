//! Description uploads: a CSV file, or a ZIP archive of CSV files, mapping
//! SKUs to description HTML.

use std::io::{Cursor, Read};

use zip::ZipArchive;

use crate::error::UploadError;

/// A local file header opens a populated archive; an empty one is nothing
/// but its end-of-central-directory record.
const ZIP_SIGNATURES: [&[u8]; 2] = [b"PK\x03\x04", b"PK\x05\x06"];

const SKU_HEADERS: &[&str] = &["sku", "product_sku", "item_sku"];
const DESCRIPTION_HEADERS: &[&str] = &[
    "description",
    "product_description",
    "html",
    "desc",
    "content",
];

/// One data row of an uploaded description file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionRow {
    pub sku: String,
    pub description: String,
    /// File the row came from (the archive entry name for ZIP uploads).
    pub file: String,
    /// 1-based line number within `file`; the header is line 1.
    pub line: u64,
}

/// Extracts description rows from an uploaded file.
///
/// ZIP archives are recognised by content, not by name. Inside an archive
/// every `.csv` entry is read in archive order; directories and macOS
/// resource forks are ignored. Text is decoded as UTF-8 unless a UTF-16 BOM
/// says otherwise. Fully blank rows are dropped; rows with a blank SKU or
/// value are kept so the importer can report them.
///
/// # Errors
///
/// Fails as a whole when the upload is empty, the archive is unreadable or
/// has no CSV entries, a file lacks a SKU or description column, or a file
/// is not parseable as CSV.
pub fn extract_description_rows(
    file_name: &str,
    bytes: &[u8],
) -> Result<Vec<DescriptionRow>, UploadError> {
    if bytes.is_empty() {
        return Err(UploadError::Empty);
    }
    if !ZIP_SIGNATURES.iter().any(|sig| bytes.starts_with(sig)) {
        return parse_csv(file_name, bytes);
    }

    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut rows = Vec::new();
    let mut csv_files = 0usize;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = entry.name().to_string();
        if entry.is_dir() || !is_csv_entry(&name) {
            continue;
        }
        let mut content = Vec::new();
        entry
            .read_to_end(&mut content)
            .map_err(|source| UploadError::ArchiveEntry {
                file: name.clone(),
                source,
            })?;
        csv_files += 1;
        rows.extend(parse_csv(&name, &content)?);
    }

    if csv_files == 0 {
        return Err(UploadError::NoCsvInArchive);
    }
    tracing::debug!(file_name, csv_files, rows = rows.len(), "description archive extracted");
    Ok(rows)
}

fn is_csv_entry(name: &str) -> bool {
    let base = name.rsplit('/').next().unwrap_or(name);
    !name.starts_with("__MACOSX/")
        && !base.starts_with("._")
        && base.to_ascii_lowercase().ends_with(".csv")
}

fn parse_csv(file: &str, bytes: &[u8]) -> Result<Vec<DescriptionRow>, UploadError> {
    let (text, encoding, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if had_errors {
        tracing::warn!(file, encoding = encoding.name(), "upload contained undecodable bytes");
    }

    let first_line = text.lines().next().unwrap_or_default();
    let delimiter = if first_line.contains('\t') && !first_line.contains(',') {
        b'\t'
    } else {
        b','
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let csv_error = |source| UploadError::Csv {
        file: file.to_string(),
        source,
    };
    let headers = reader.headers().map_err(csv_error)?.clone();
    let sku_column = find_column(&headers, SKU_HEADERS)
        .ok_or_else(|| missing(file, "SKU", SKU_HEADERS))?;
    let description_column = find_column(&headers, DESCRIPTION_HEADERS)
        .ok_or_else(|| missing(file, "description", DESCRIPTION_HEADERS))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(DescriptionRow {
            sku: record.get(sku_column).unwrap_or_default().to_string(),
            description: record
                .get(description_column)
                .unwrap_or_default()
                .to_string(),
            file: file.to_string(),
            line: record.position().map_or(0, csv::Position::line),
        });
    }
    Ok(rows)
}

/// Index of the first header matching one of `aliases`, trying aliases in
/// order. Matching is case-insensitive.
fn find_column(headers: &csv::StringRecord, aliases: &[&str]) -> Option<usize> {
    aliases.iter().find_map(|alias| {
        headers
            .iter()
            .position(|header| header.trim_start_matches('\u{feff}').eq_ignore_ascii_case(alias))
    })
}

fn missing(file: &str, column: &'static str, aliases: &[&str]) -> UploadError {
    UploadError::MissingColumn {
        file: file.to_string(),
        column,
        accepted: aliases.join(", "),
    }
}
