//! Helpers over the free-form metadata map carried by catalog rows.
//!
//! Metadata is stored as a JSON object (`jsonb` in Postgres). Legacy imports
//! put external identifiers and display fields under several different keys,
//! so lookups walk an explicit, ordered list of candidate keys.

use serde_json::{Map, Value};

/// Free-form key/value map attached to categories and products.
pub type Metadata = Map<String, Value>;

/// Metadata keys that may carry a category's external identifier, in
/// priority order. The first key holding a string value wins.
pub const ENTITY_ID_METADATA_KEYS: &[&str] = &[
    "magento_entity_id",
    "magento_id",
    "legacy_id",
    "entity_id",
    "external_id",
];

pub const IMAGE_METADATA_KEYS: &[&str] = &["image", "image_url", "thumbnail"];

pub const URL_PATH_METADATA_KEYS: &[&str] = &["url_path", "magento_url_path"];

/// Boolean metadata key that overrides the stored `is_active` flag.
pub const IS_ACTIVE_METADATA_KEY: &str = "is_active";

/// Returns the first non-empty string value found under `keys`, in order.
///
/// Non-string values (numbers, objects, `null`) are skipped rather than
/// coerced.
#[must_use]
pub fn select_metadata_string<'a>(metadata: &'a Metadata, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| {
        metadata
            .get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    })
}

/// Reads a boolean override from metadata, accepting `true`/`false`,
/// `1`/`0`, and the strings `"true"`, `"false"`, `"1"`, `"0"`.
#[must_use]
pub fn select_metadata_bool(metadata: &Metadata, key: &str) -> Option<bool> {
    match metadata.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|v| v != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Iterates over every string-typed value in the map. Nested objects and
/// arrays are not descended into.
pub fn string_values(metadata: &Metadata) -> impl Iterator<Item = &str> {
    metadata.values().filter_map(Value::as_str)
}
