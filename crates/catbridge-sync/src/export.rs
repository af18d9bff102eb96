//! Rendering nodes in the legacy Magento category shape.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::tree::CategoryNode;

/// A category as legacy storefront clients expect it: external ids as
/// strings, `parent_id` pointing at the parent's entity id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyCategory {
    pub parent_id: Option<String>,
    pub entity_id: String,
    pub name: String,
    pub image: Option<String>,
    pub url_path: Option<String>,
    pub children_count: usize,
    pub children_data: Vec<LegacyCategory>,
}

/// Formats nodes against the full node map of their tree, which is needed
/// to turn local parent ids into entity ids.
pub struct CatalogExportFormatter<'a> {
    nodes: &'a HashMap<i64, CategoryNode>,
}

impl<'a> CatalogExportFormatter<'a> {
    #[must_use]
    pub fn new(nodes: &'a HashMap<i64, CategoryNode>) -> Self {
        Self { nodes }
    }

    /// Renders `node` and its children recursively.
    #[must_use]
    pub fn to_legacy_shape(&self, node: &CategoryNode) -> LegacyCategory {
        let children_data: Vec<LegacyCategory> = node
            .children
            .iter()
            .map(|child| self.to_legacy_shape(child))
            .collect();
        LegacyCategory {
            children_count: children_data.len(),
            children_data,
            ..self.to_legacy_leaf(node)
        }
    }

    /// Renders `node` alone. `children_count` still reports the node's
    /// children; `children_data` is empty.
    #[must_use]
    pub fn to_legacy_leaf(&self, node: &CategoryNode) -> LegacyCategory {
        LegacyCategory {
            parent_id: node
                .parent_id
                .and_then(|id| self.nodes.get(&id))
                .map(|parent| parent.entity_id.clone()),
            entity_id: node.entity_id.clone(),
            name: node.name.clone(),
            image: node.image.clone(),
            url_path: node.url_path.clone(),
            children_count: node.children.len(),
            children_data: Vec::new(),
        }
    }
}
