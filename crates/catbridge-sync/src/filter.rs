//! Brand-restricted pruning of a category tree.

use std::collections::BTreeSet;

use catbridge_core::metadata::string_values;

use crate::tree::{CategoryNode, CategoryTree};

/// Matches nodes against an access key's brand set. An empty set is
/// unrestricted and matches every node.
pub struct BrandRestrictionFilter<'a> {
    brand_ids: &'a BTreeSet<String>,
}

impl<'a> BrandRestrictionFilter<'a> {
    #[must_use]
    pub fn new(brand_ids: &'a BTreeSet<String>) -> Self {
        Self { brand_ids }
    }

    /// A node matches when its entity id, its local id, or any string value
    /// in its metadata is in the brand set.
    #[must_use]
    pub fn matches(&self, node: &CategoryNode) -> bool {
        if self.brand_ids.is_empty() {
            return true;
        }
        self.brand_ids.contains(&node.entity_id)
            || self.brand_ids.contains(&node.id.to_string())
            || string_values(&node.metadata).any(|value| self.brand_ids.contains(value))
    }

    /// Returns a copy of `node` whose descendants are pruned to those that
    /// match or lead to a match. `node` itself is always kept.
    #[must_use]
    pub fn filter_children(&self, node: &CategoryNode) -> CategoryNode {
        let mut filtered = node.clone();
        filtered.children = node
            .children
            .iter()
            .filter_map(|child| self.prune(child))
            .collect();
        filtered
    }

    /// Top-level nodes are kept as they are; everything below them is
    /// pruned.
    #[must_use]
    pub fn filter_tree(&self, tree: &CategoryTree) -> Vec<CategoryNode> {
        tree.top_level
            .iter()
            .map(|root| self.filter_children(root))
            .collect()
    }

    /// Every matching node at any depth, sorted by name.
    #[must_use]
    pub fn matching_nodes<'t>(&self, tree: &'t CategoryTree) -> Vec<&'t CategoryNode> {
        let mut matched: Vec<&CategoryNode> = tree
            .all_nodes()
            .into_iter()
            .filter(|node| self.matches(node))
            .collect();
        matched.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        matched
    }

    fn prune(&self, node: &CategoryNode) -> Option<CategoryNode> {
        let children: Vec<CategoryNode> = node
            .children
            .iter()
            .filter_map(|child| self.prune(child))
            .collect();
        if children.is_empty() && !self.matches(node) {
            return None;
        }
        let mut kept = node.clone();
        kept.children = children;
        Some(kept)
    }
}
