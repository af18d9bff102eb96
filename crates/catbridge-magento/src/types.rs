//! Magento REST response types.
//!
//! ## Observed quirks
//!
//! - Identifiers are integers on the entity itself but strings inside
//!   `category_links` and attribute option values. Both forms are accepted.
//! - `children_data` is only populated by the `GET /V1/categories` tree
//!   endpoint; `categories/list` returns flat rows with `parent_id` and
//!   `level` instead.
//! - `custom_attributes` values are usually strings but may be arrays
//!   (e.g. `category_ids`), so they are kept as raw JSON.
//! - The root catalog has `parent_id: 0`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A category as returned by `categories/list` or the nested tree endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct MagentoCategory {
    pub id: i64,

    /// `0` or absent for the root catalog.
    #[serde(default)]
    pub parent_id: Option<i64>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub is_active: Option<bool>,

    #[serde(default)]
    pub position: Option<i32>,

    /// Depth in the source tree; the root catalog is level 0 or 1 depending
    /// on the endpoint. Filled from nesting depth when absent.
    #[serde(default)]
    pub level: Option<i32>,

    #[serde(default)]
    pub children_data: Vec<MagentoCategory>,

    #[serde(default)]
    pub custom_attributes: Vec<CustomAttribute>,
}

impl MagentoCategory {
    /// The parent's external id, or `None` for a root.
    #[must_use]
    pub fn parent_external_id(&self) -> Option<i64> {
        self.parent_id.filter(|id| *id > 0)
    }

    #[must_use]
    pub fn custom_attribute(&self, code: &str) -> Option<&str> {
        find_custom_attribute(&self.custom_attributes, code)
    }
}

/// A product as returned by `GET /V1/products`.
#[derive(Debug, Clone, Deserialize)]
pub struct MagentoProduct {
    pub id: i64,

    #[serde(default)]
    pub sku: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub price: Option<f64>,

    /// `1` = enabled, `2` = disabled.
    #[serde(default)]
    pub status: Option<i32>,

    #[serde(default)]
    pub type_id: Option<String>,

    #[serde(default)]
    pub visibility: Option<i32>,

    #[serde(default)]
    pub custom_attributes: Vec<CustomAttribute>,

    #[serde(default)]
    pub extension_attributes: Option<ProductExtension>,
}

impl MagentoProduct {
    #[must_use]
    pub fn custom_attribute(&self, code: &str) -> Option<&str> {
        find_custom_attribute(&self.custom_attributes, code)
    }

    /// External ids of the categories this product is linked to, from
    /// `extension_attributes.category_links` and the `category_ids` custom
    /// attribute, deduplicated in first-seen order.
    #[must_use]
    pub fn category_external_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        let links = self
            .extension_attributes
            .iter()
            .flat_map(|ext| ext.category_links.iter())
            .map(|link| link.category_id.clone());

        let attr_ids = self
            .custom_attributes
            .iter()
            .filter(|a| a.attribute_code == "category_ids")
            .flat_map(|a| match &a.value {
                Value::Array(values) => values.iter().filter_map(value_as_id).collect(),
                other => value_as_id(other).into_iter().collect::<Vec<_>>(),
            });

        for id in links.chain(attr_ids) {
            if !id.is_empty() && !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductExtension {
    #[serde(default)]
    pub category_links: Vec<CategoryLink>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryLink {
    #[serde(deserialize_with = "string_or_number")]
    pub category_id: String,
    #[serde(default)]
    pub position: Option<i32>,
}

/// A product attribute definition from `GET /V1/products/attributes`.
#[derive(Debug, Clone, Deserialize)]
pub struct MagentoAttribute {
    #[serde(default)]
    pub attribute_id: Option<i64>,

    #[serde(default)]
    pub attribute_code: Option<String>,

    #[serde(default)]
    pub default_frontend_label: Option<String>,

    #[serde(default)]
    pub frontend_input: Option<String>,

    #[serde(default)]
    pub options: Vec<AttributeOption>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct AttributeOption {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomAttribute {
    pub attribute_code: String,
    #[serde(default)]
    pub value: Value,
}

fn find_custom_attribute<'a>(attributes: &'a [CustomAttribute], code: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.attribute_code == code)
        .and_then(|a| a.value.as_str())
        .filter(|s| !s.trim().is_empty())
}

fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_as_id(&value).ok_or_else(|| serde::de::Error::custom("expected string or number id"))
}
