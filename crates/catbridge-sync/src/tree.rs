//! Category tree reconstruction from flat rows.
//!
//! The tree is rebuilt from the store on every read and never mutated
//! afterwards; filtering produces new trees.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use catbridge_core::metadata::{
    select_metadata_bool, IMAGE_METADATA_KEYS, IS_ACTIVE_METADATA_KEY, URL_PATH_METADATA_KEYS,
};
use catbridge_core::{
    select_metadata_string, CatalogStore, CategoryRecord, Metadata, StoreError,
    ENTITY_ID_METADATA_KEYS,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryNode {
    pub id: i64,
    /// External key from metadata, else the local id.
    pub entity_id: String,
    pub name: String,
    /// The parent this node is attached under in this tree. `None` for
    /// roots, for rows whose parent is missing and for a node detached to
    /// break a cycle.
    pub parent_id: Option<i64>,
    pub handle: Option<String>,
    pub image: Option<String>,
    pub url_path: Option<String>,
    pub rank: Option<i32>,
    /// 1 for roots, parent level + 1 otherwise.
    pub level: u32,
    pub is_active: bool,
    pub children: Vec<CategoryNode>,
    pub metadata: Metadata,
}

impl CategoryNode {
    fn from_record(record: CategoryRecord) -> Self {
        let entity_id = select_metadata_string(&record.metadata, ENTITY_ID_METADATA_KEYS)
            .map_or_else(|| record.id.to_string(), str::to_string);
        let image =
            select_metadata_string(&record.metadata, IMAGE_METADATA_KEYS).map(str::to_string);
        let url_path = select_metadata_string(&record.metadata, URL_PATH_METADATA_KEYS)
            .map(str::to_string)
            .or_else(|| record.handle.as_ref().map(|h| format!("/category/{h}")));
        let is_active = select_metadata_bool(&record.metadata, IS_ACTIVE_METADATA_KEY)
            .unwrap_or(record.is_active);

        Self {
            id: record.id,
            entity_id,
            name: record.name,
            parent_id: record.parent_id,
            handle: record.handle,
            image,
            url_path,
            rank: record.rank,
            level: 1,
            is_active,
            children: Vec::new(),
            metadata: record.metadata,
        }
    }

    /// Visits this node and every descendant, depth-first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a CategoryNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// Display order: rank ascending with unranked nodes last, then name
/// case-insensitively, then name, then id.
#[must_use]
pub fn display_order(a: &CategoryNode, b: &CategoryNode) -> Ordering {
    let rank = match (a.rank, b.rank) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    rank.then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryTree {
    /// Every node by local id, each carrying its own subtree.
    pub nodes: HashMap<i64, CategoryNode>,
    /// Root nodes in display order.
    pub top_level: Vec<CategoryNode>,
}

impl CategoryTree {
    /// Assembles a tree from flat rows.
    ///
    /// A row whose parent is not among `records` becomes a root. Cycles are
    /// broken by detaching the member with the smallest id, which becomes a
    /// root; the rest of the cycle hangs below it.
    #[must_use]
    pub fn from_records(records: Vec<CategoryRecord>) -> Self {
        let mut base: HashMap<i64, CategoryNode> = records
            .into_iter()
            .map(|r| (r.id, CategoryNode::from_record(r)))
            .collect();

        let mut ids: Vec<i64> = base.keys().copied().collect();
        ids.sort_unstable();

        let mut parent_of: HashMap<i64, Option<i64>> = HashMap::with_capacity(ids.len());
        for id in &ids {
            let declared = base.get(id).and_then(|node| node.parent_id);
            let resolved = declared.filter(|p| base.contains_key(p));
            if let (Some(missing), None) = (declared, resolved) {
                tracing::debug!(id, parent_id = missing, "category parent not found; treating as root");
            }
            parent_of.insert(*id, resolved);
        }

        break_cycles(&ids, &mut parent_of);
        let levels = compute_levels(&ids, &parent_of);

        let mut children_of: HashMap<i64, Vec<i64>> = HashMap::new();
        let mut roots: Vec<i64> = Vec::new();
        for id in &ids {
            let parent = parent_of.get(id).copied().flatten();
            if let Some(node) = base.get_mut(id) {
                node.parent_id = parent;
                node.level = levels.get(id).copied().unwrap_or(1);
            }
            match parent {
                Some(parent) => children_of.entry(parent).or_default().push(*id),
                None => roots.push(*id),
            }
        }

        let mut nodes: HashMap<i64, CategoryNode> = HashMap::with_capacity(ids.len());
        let mut top_level: Vec<CategoryNode> = roots
            .iter()
            .filter_map(|id| assemble(*id, &mut base, &children_of, &mut nodes))
            .collect();
        top_level.sort_by(display_order);

        Self { nodes, top_level }
    }

    /// Every node in the tree, depth-first in display order.
    #[must_use]
    pub fn all_nodes(&self) -> Vec<&CategoryNode> {
        let mut out = Vec::with_capacity(self.nodes.len());
        for root in &self.top_level {
            root.walk(&mut |node| out.push(node));
        }
        out
    }
}

/// Detaches one member of every parent-pointer cycle.
fn break_cycles(ids: &[i64], parent_of: &mut HashMap<i64, Option<i64>>) {
    let mut done: HashSet<i64> = HashSet::with_capacity(ids.len());

    for start in ids {
        let mut path: Vec<i64> = Vec::new();
        let mut on_path: HashSet<i64> = HashSet::new();
        let mut current = Some(*start);

        while let Some(id) = current {
            if done.contains(&id) {
                break;
            }
            if on_path.contains(&id) {
                let cycle_start = path.iter().position(|p| *p == id).unwrap_or(0);
                let cycle = &path[cycle_start..];
                let detached = cycle.iter().copied().min().unwrap_or(id);
                tracing::warn!(
                    cycle = ?cycle,
                    detached,
                    "category parent cycle detected; detaching smallest id as root"
                );
                parent_of.insert(detached, None);
                break;
            }
            path.push(id);
            on_path.insert(id);
            current = parent_of.get(&id).copied().flatten();
        }

        done.extend(path);
    }
}

fn compute_levels(ids: &[i64], parent_of: &HashMap<i64, Option<i64>>) -> HashMap<i64, u32> {
    let mut levels: HashMap<i64, u32> = HashMap::with_capacity(ids.len());

    for start in ids {
        let mut chain: Vec<i64> = Vec::new();
        let mut current = Some(*start);
        let mut base_level = 0;
        while let Some(id) = current {
            if let Some(level) = levels.get(&id) {
                base_level = *level;
                break;
            }
            chain.push(id);
            current = parent_of.get(&id).copied().flatten();
        }
        for (depth, id) in chain.iter().rev().enumerate() {
            let offset = u32::try_from(depth).unwrap_or(u32::MAX);
            levels.insert(*id, base_level.saturating_add(offset).saturating_add(1));
        }
    }

    levels
}

/// Moves node `id` out of `base` with its subtree attached. Each id is
/// taken at most once, so a node can only ever have one parent.
fn assemble(
    id: i64,
    base: &mut HashMap<i64, CategoryNode>,
    children_of: &HashMap<i64, Vec<i64>>,
    nodes: &mut HashMap<i64, CategoryNode>,
) -> Option<CategoryNode> {
    let mut node = base.remove(&id)?;
    if let Some(child_ids) = children_of.get(&id) {
        node.children = child_ids
            .iter()
            .filter_map(|child| assemble(*child, base, children_of, nodes))
            .collect();
        node.children.sort_by(display_order);
    }
    nodes.insert(id, node.clone());
    Some(node)
}

/// Reads categories from the store and builds a [`CategoryTree`].
pub struct CategoryTreeBuilder<'a> {
    store: &'a dyn CatalogStore,
}

impl<'a> CategoryTreeBuilder<'a> {
    #[must_use]
    pub fn new(store: &'a dyn CatalogStore) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] if the categories cannot be listed.
    pub async fn build(&self) -> Result<CategoryTree, StoreError> {
        let records = self.store.list_categories().await?;
        Ok(CategoryTree::from_records(records))
    }
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tests;
