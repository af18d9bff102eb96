//! Catalog record shapes exchanged between the engines and a
//! [`crate::CatalogStore`].
//!
//! `*Record` types are what the store hands back; `New*` and `*Update` types
//! are write payloads. Local ids are the store's serial keys and never change
//! once assigned.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::metadata::Metadata;

/// A persisted, non-deleted category row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: i64,
    /// External key stamped at insert time; `None` for rows created locally.
    pub external_id: Option<String>,
    pub name: String,
    pub parent_id: Option<i64>,
    pub handle: Option<String>,
    pub rank: Option<i32>,
    pub level: Option<i32>,
    pub is_active: bool,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    pub external_id: String,
    pub name: String,
    pub handle: String,
    pub parent_id: Option<i64>,
    pub rank: Option<i32>,
    pub level: Option<i32>,
    pub is_active: bool,
    pub metadata: Metadata,
}

/// Mutable category fields. The handle is deliberately absent: slugs are
/// allocated once on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryUpdate {
    pub name: String,
    pub parent_id: Option<i64>,
    pub rank: Option<i32>,
    pub level: Option<i32>,
    pub is_active: bool,
    /// Merged over the stored metadata; keys not present here are kept.
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: i64,
    pub external_id: Option<String>,
    pub sku: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub external_id: String,
    pub sku: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub status: String,
    pub type_id: Option<String>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductUpdate {
    pub external_id: String,
    pub name: String,
    /// `None` keeps the stored description.
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub status: String,
    pub type_id: Option<String>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRecord {
    pub id: i64,
    pub code: String,
    pub label: Option<String>,
    pub input_type: Option<String>,
    pub options: serde_json::Value,
}

/// Insert and update payload for attributes; the code is the natural key.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttribute {
    pub code: String,
    pub label: Option<String>,
    pub input_type: Option<String>,
    pub options: serde_json::Value,
}
