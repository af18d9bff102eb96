//! [`ImportRecord`] implementations for the Magento payloads and for
//! uploaded description rows.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use catbridge_core::{EntityKind, Metadata, NewAttribute};
use catbridge_magento::{MagentoAttribute, MagentoCategory, MagentoProduct};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use super::ImportRecord;
use crate::error::ReconcileError;
use crate::reconcile::{CategoryPayload, EntityReconciler, ProductPayload, Reconciled};
use crate::upload::DescriptionRow;

/// Custom attributes copied into category metadata when present.
const CATEGORY_METADATA_ATTRIBUTES: &[&str] = &["url_path", "image", "url_key"];

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[async_trait]
impl ImportRecord for MagentoCategory {
    const KIND: EntityKind = EntityKind::Category;

    fn external_id(&self) -> String {
        self.id.to_string()
    }

    fn label(&self) -> Option<String> {
        non_blank(self.name.as_deref()).map(str::to_string)
    }

    fn validate(&self) -> Result<(), String> {
        if non_blank(self.name.as_deref()).is_none() {
            return Err(format!("Category {} skipped: missing name", self.id));
        }
        Ok(())
    }

    fn dependency_order(records: Vec<Self>) -> Vec<Self> {
        parents_first(records)
    }

    fn flatten_into(self, out: &mut Vec<Self>) {
        flatten_category(self, None, out);
    }

    async fn reconcile(
        &self,
        reconciler: &mut EntityReconciler<'_>,
    ) -> Result<Reconciled, ReconcileError> {
        reconciler.reconcile_category(&category_payload(self)).await
    }
}

/// Depth-first walk of `children_data`. A child without its own `level`
/// sits one below its parent's effective level, and one without
/// `parent_id` gets the enclosing node's id.
fn flatten_category(
    mut category: MagentoCategory,
    parent: Option<(i64, i32)>,
    out: &mut Vec<MagentoCategory>,
) {
    let children = std::mem::take(&mut category.children_data);
    let level = category
        .level
        .unwrap_or_else(|| parent.map_or(0, |(_, level)| level.saturating_add(1)));
    category.level = Some(level);
    if category.parent_id.is_none() {
        category.parent_id = parent.map(|(id, _)| id);
    }
    let id = category.id;
    out.push(category);
    for child in children {
        flatten_category(child, Some((id, level)), out);
    }
}

/// Stable sort by the number of ancestors present in the batch, so a parent
/// is always written before its children. Parents outside the batch are
/// expected to exist already and do not count.
fn parents_first(mut rows: Vec<MagentoCategory>) -> Vec<MagentoCategory> {
    let parent_of: HashMap<i64, Option<i64>> = rows
        .iter()
        .map(|row| (row.id, row.parent_external_id()))
        .collect();
    let mut depths: HashMap<i64, usize> = HashMap::with_capacity(parent_of.len());
    for row in &rows {
        batch_depth(row.id, &parent_of, &mut depths);
    }
    rows.sort_by_key(|row| depths.get(&row.id).copied().unwrap_or(0));
    rows
}

fn batch_depth(
    start: i64,
    parent_of: &HashMap<i64, Option<i64>>,
    depths: &mut HashMap<i64, usize>,
) {
    let mut chain: Vec<i64> = Vec::new();
    let mut seen: HashSet<i64> = HashSet::new();
    let mut base = 0;
    let mut current = Some(start);

    while let Some(id) = current {
        if let Some(depth) = depths.get(&id) {
            base = depth + 1;
            break;
        }
        // A parent cycle; its members are ordered as if the chain started here.
        if !seen.insert(id) {
            break;
        }
        chain.push(id);
        current = parent_of
            .get(&id)
            .copied()
            .flatten()
            .filter(|parent| parent_of.contains_key(parent));
    }

    for (offset, id) in chain.iter().rev().enumerate() {
        depths.insert(*id, base + offset);
    }
}

fn category_payload(category: &MagentoCategory) -> CategoryPayload {
    let external_id = category.id.to_string();
    let mut metadata = Metadata::new();
    metadata.insert("magento_entity_id".to_string(), json!(external_id));
    for code in CATEGORY_METADATA_ATTRIBUTES {
        if let Some(value) = category.custom_attribute(code) {
            metadata.insert((*code).to_string(), json!(value.trim()));
        }
    }

    CategoryPayload {
        external_id,
        name: category.name.as_deref().unwrap_or_default().trim().to_string(),
        parent_external_id: category.parent_external_id().map(|id| id.to_string()),
        rank: category.position,
        level: category.level,
        is_active: category.is_active.unwrap_or(true),
        metadata,
    }
}

#[async_trait]
impl ImportRecord for MagentoProduct {
    const KIND: EntityKind = EntityKind::Product;

    fn external_id(&self) -> String {
        self.id.to_string()
    }

    fn label(&self) -> Option<String> {
        non_blank(self.name.as_deref())
            .or_else(|| non_blank(self.sku.as_deref()))
            .map(str::to_string)
    }

    fn validate(&self) -> Result<(), String> {
        let Some(sku) = non_blank(self.sku.as_deref()) else {
            return Err(format!("Product {} skipped: missing SKU", self.id));
        };
        if non_blank(self.name.as_deref()).is_none() {
            return Err(format!("Product {sku} skipped: missing name"));
        }
        Ok(())
    }

    async fn reconcile(
        &self,
        reconciler: &mut EntityReconciler<'_>,
    ) -> Result<Reconciled, ReconcileError> {
        reconciler.reconcile_product(&product_payload(self)).await
    }
}

fn product_payload(product: &MagentoProduct) -> ProductPayload {
    let external_id = product.id.to_string();
    let mut metadata = Metadata::new();
    metadata.insert("magento_entity_id".to_string(), json!(external_id));
    if let Some(url_key) = product.custom_attribute("url_key") {
        metadata.insert("url_key".to_string(), json!(url_key.trim()));
    }
    if let Some(visibility) = product.visibility {
        metadata.insert("visibility".to_string(), json!(visibility));
    }

    let description = product
        .custom_attribute("description")
        .or_else(|| product.custom_attribute("short_description"))
        .map(str::to_string);

    ProductPayload {
        external_id,
        sku: product.sku.as_deref().unwrap_or_default().trim().to_string(),
        name: product.name.as_deref().unwrap_or_default().trim().to_string(),
        description,
        price: product
            .price
            .and_then(|p| Decimal::try_from(p).ok())
            .map(|d| d.round_dp(4)),
        status: match product.status {
            Some(2) => "disabled".to_string(),
            _ => "enabled".to_string(),
        },
        type_id: product.type_id.clone(),
        metadata,
        category_external_ids: product.category_external_ids(),
    }
}

#[async_trait]
impl ImportRecord for MagentoAttribute {
    const KIND: EntityKind = EntityKind::Attribute;

    fn external_id(&self) -> String {
        non_blank(self.attribute_code.as_deref()).map_or_else(
            || self.attribute_id.map(|id| id.to_string()).unwrap_or_default(),
            str::to_string,
        )
    }

    fn label(&self) -> Option<String> {
        non_blank(self.default_frontend_label.as_deref())
            .or_else(|| non_blank(self.attribute_code.as_deref()))
            .map(str::to_string)
    }

    fn validate(&self) -> Result<(), String> {
        if non_blank(self.attribute_code.as_deref()).is_none() {
            return Err(format!(
                "Attribute {} skipped: missing attribute_code",
                self.attribute_id
                    .map_or_else(|| "<no id>".to_string(), |id| id.to_string())
            ));
        }
        Ok(())
    }

    async fn reconcile(
        &self,
        reconciler: &mut EntityReconciler<'_>,
    ) -> Result<Reconciled, ReconcileError> {
        reconciler.reconcile_attribute(&attribute_payload(self)).await
    }
}

/// Magento lists a blank placeholder as the first option of most select
/// attributes; options without a label are dropped.
fn attribute_payload(attribute: &MagentoAttribute) -> NewAttribute {
    let options = attribute
        .options
        .iter()
        .filter_map(|option| {
            non_blank(option.label.as_deref())
                .map(|label| json!({ "label": label, "value": option.value }))
        })
        .collect::<Vec<Value>>();

    NewAttribute {
        code: attribute
            .attribute_code
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_string(),
        label: non_blank(attribute.default_frontend_label.as_deref()).map(str::to_string),
        input_type: non_blank(attribute.frontend_input.as_deref()).map(str::to_string),
        options: Value::Array(options),
    }
}

#[async_trait]
impl ImportRecord for DescriptionRow {
    const KIND: EntityKind = EntityKind::Description;

    fn external_id(&self) -> String {
        self.sku.trim().to_string()
    }

    fn label(&self) -> Option<String> {
        non_blank(Some(self.sku.as_str())).map(str::to_string)
    }

    fn validate(&self) -> Result<(), String> {
        if self.sku.trim().is_empty() {
            return Err(format!("{} line {}: missing SKU", self.file, self.line));
        }
        if self.description.trim().is_empty() {
            return Err(format!(
                "{} line {}: empty description for SKU {}",
                self.file,
                self.line,
                self.sku.trim()
            ));
        }
        Ok(())
    }

    async fn reconcile(
        &self,
        reconciler: &mut EntityReconciler<'_>,
    ) -> Result<Reconciled, ReconcileError> {
        reconciler
            .apply_description(self.sku.trim(), self.description.trim())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(value: Value) -> MagentoCategory {
        serde_json::from_value(value).expect("category json")
    }

    #[test]
    fn flatten_preserves_every_node_once_and_fills_levels() {
        let root = category(json!({
            "id": 1, "parent_id": 0, "name": "Root",
            "children_data": [
                { "id": 2, "name": "Shoes", "children_data": [
                    { "id": 4, "name": "Boots" }
                ] },
                { "id": 3, "parent_id": 1, "name": "Bags", "level": 7 }
            ]
        }));

        let mut flat = Vec::new();
        root.flatten_into(&mut flat);

        let ids: Vec<i64> = flat.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 4, 3]);
        assert!(flat.iter().all(|c| c.children_data.is_empty()));
        assert_eq!(flat[1].parent_id, Some(1));
        assert_eq!(flat[2].parent_id, Some(2));
        assert_eq!(flat[2].level, Some(2));
        assert_eq!(flat[3].level, Some(7), "explicit level wins");
    }

    #[test]
    fn flatten_fills_levels_below_an_explicit_parent_level() {
        let subtree = category(json!({
            "id": 3, "parent_id": 1, "name": "Women", "level": 2,
            "children_data": [ { "id": 5, "name": "Shoes" } ]
        }));

        let mut flat = Vec::new();
        subtree.flatten_into(&mut flat);

        assert_eq!(flat[1].level, Some(3));
        assert_eq!(flat[1].parent_id, Some(3));
    }

    #[test]
    fn parents_first_follows_parent_chains_not_ids() {
        let rows = vec![
            category(json!({ "id": 3, "parent_id": 1, "name": "Leaf" })),
            category(json!({ "id": 1, "parent_id": 7, "name": "Middle" })),
            category(json!({ "id": 7, "parent_id": 0, "name": "Top" })),
        ];
        let ids: Vec<i64> = MagentoCategory::dependency_order(rows)
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![7, 1, 3]);
    }

    #[test]
    fn parents_first_keeps_source_order_among_siblings_and_survives_cycles() {
        let rows = vec![
            category(json!({ "id": 9, "parent_id": 8, "name": "Loop A" })),
            category(json!({ "id": 8, "parent_id": 9, "name": "Loop B" })),
            category(json!({ "id": 6, "parent_id": 2, "name": "Second" })),
            category(json!({ "id": 5, "parent_id": 2, "name": "First" })),
            category(json!({ "id": 2, "parent_id": 0, "name": "Root" })),
        ];
        let ids: Vec<i64> = MagentoCategory::dependency_order(rows)
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids.len(), 5);
        let position = |id: i64| ids.iter().position(|x| *x == id).expect("present");
        assert!(position(2) < position(6));
        assert!(position(6) < position(5), "siblings keep source order");
    }

    #[test]
    fn category_payload_stamps_external_id_and_display_fields() {
        let row = category(json!({
            "id": 41, "parent_id": 2, "name": " Shoes ", "position": 3, "is_active": false,
            "custom_attributes": [
                { "attribute_code": "url_path", "value": "women/shoes" },
                { "attribute_code": "image", "value": "shoes.jpg" },
                { "attribute_code": "meta_title", "value": "ignored" }
            ]
        }));
        let payload = category_payload(&row);
        assert_eq!(payload.name, "Shoes");
        assert_eq!(payload.parent_external_id.as_deref(), Some("2"));
        assert_eq!(payload.rank, Some(3));
        assert!(!payload.is_active);
        assert_eq!(payload.metadata.get("magento_entity_id"), Some(&json!("41")));
        assert_eq!(payload.metadata.get("url_path"), Some(&json!("women/shoes")));
        assert_eq!(payload.metadata.get("image"), Some(&json!("shoes.jpg")));
        assert!(payload.metadata.get("meta_title").is_none());
    }

    #[test]
    fn product_validation_requires_sku_then_name() {
        let no_sku: MagentoProduct =
            serde_json::from_value(json!({ "id": 9, "name": "Thing" })).expect("json");
        assert!(no_sku.validate().expect_err("skip").contains("missing SKU"));

        let no_name: MagentoProduct =
            serde_json::from_value(json!({ "id": 9, "sku": "T-1" })).expect("json");
        assert!(no_name.validate().expect_err("skip").contains("missing name"));
    }

    #[test]
    fn product_payload_computes_description_price_and_status() {
        let product: MagentoProduct = serde_json::from_value(json!({
            "id": 10, "sku": "RS-1", "name": "Red Shoe", "price": 59.9, "status": 2,
            "custom_attributes": [
                { "attribute_code": "short_description", "value": "short" }
            ]
        }))
        .expect("json");
        let payload = product_payload(&product);
        assert_eq!(payload.description.as_deref(), Some("short"));
        assert_eq!(payload.price, Some(Decimal::new(599, 1)));
        assert_eq!(payload.status, "disabled");
    }

    #[test]
    fn attribute_payload_drops_blank_options() {
        let attribute: MagentoAttribute = serde_json::from_value(json!({
            "attribute_code": "color",
            "default_frontend_label": "Color",
            "frontend_input": "select",
            "options": [ { "label": " ", "value": "" }, { "label": "Red", "value": "12" } ]
        }))
        .expect("json");
        let payload = attribute_payload(&attribute);
        assert_eq!(payload.options, json!([{ "label": "Red", "value": "12" }]));
    }

    #[test]
    fn description_row_validation() {
        let row = DescriptionRow {
            sku: "RS-1".to_string(),
            description: "   ".to_string(),
            file: "descriptions.csv".to_string(),
            line: 3,
        };
        let warning = row.validate().expect_err("empty value");
        assert!(warning.contains("descriptions.csv line 3"));
    }
}
