use serde_json::{json, Value};

use super::*;
use crate::memory::MemoryCatalogStore;

fn record(id: i64, name: &str, parent_id: Option<i64>, rank: Option<i32>) -> CategoryRecord {
    CategoryRecord {
        id,
        external_id: None,
        name: name.to_string(),
        parent_id,
        handle: Some(name.to_lowercase().replace(' ', "-")),
        rank,
        level: None,
        is_active: true,
        metadata: Metadata::new(),
    }
}

fn with_metadata(mut record: CategoryRecord, value: Value) -> CategoryRecord {
    if let Value::Object(map) = value {
        record.metadata = map;
    }
    record
}

fn assert_levels(node: &CategoryNode, expected: u32) {
    assert_eq!(node.level, expected, "level of {}", node.name);
    for child in &node.children {
        assert_eq!(child.parent_id, Some(node.id));
        assert_levels(child, expected + 1);
    }
}

fn assert_sorted(nodes: &[CategoryNode]) {
    for pair in nodes.windows(2) {
        assert_ne!(
            display_order(&pair[0], &pair[1]),
            Ordering::Greater,
            "{} sorted after {}",
            pair[0].name,
            pair[1].name
        );
    }
    for node in nodes {
        assert_sorted(&node.children);
    }
}

#[test]
fn levels_follow_the_parent_chain() {
    let tree = CategoryTree::from_records(vec![
        record(3, "Boots", Some(2), None),
        record(1, "Root", None, None),
        record(2, "Shoes", Some(1), None),
        record(4, "Hiking", Some(3), None),
    ]);

    assert_eq!(tree.top_level.len(), 1);
    assert_levels(&tree.top_level[0], 1);
    assert_eq!(tree.nodes[&4].level, 4);
    assert_eq!(tree.nodes.len(), 4);
}

#[test]
fn siblings_sort_by_rank_then_name_with_unranked_last() {
    let tree = CategoryTree::from_records(vec![
        record(1, "Root", None, None),
        record(2, "zebra", Some(1), None),
        record(3, "Apple", Some(1), None),
        record(4, "banana", Some(1), Some(5)),
        record(5, "Cherry", Some(1), Some(1)),
        record(6, "Top B", None, Some(2)),
        record(7, "Top A", None, Some(2)),
    ]);

    let root_names: Vec<&str> = tree.top_level.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(root_names, vec!["Top A", "Top B", "Root"]);

    let root = tree.nodes.get(&1).expect("root");
    let child_names: Vec<&str> = root.children.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(child_names, vec!["Cherry", "banana", "Apple", "zebra"]);
    assert_sorted(&tree.top_level);
}

#[test]
fn unresolvable_parent_becomes_a_root() {
    let tree = CategoryTree::from_records(vec![
        record(1, "Root", None, None),
        record(2, "Orphan", Some(99), None),
    ]);

    let orphan = tree.nodes.get(&2).expect("orphan kept");
    assert_eq!(orphan.parent_id, None);
    assert_eq!(orphan.level, 1);
    assert_eq!(tree.top_level.len(), 2);
}

#[test]
fn cycles_are_broken_at_the_smallest_id() {
    let tree = CategoryTree::from_records(vec![
        record(5, "A", Some(7), None),
        record(7, "B", Some(9), None),
        record(9, "C", Some(5), None),
        record(10, "Leaf", Some(9), None),
    ]);

    assert_eq!(tree.top_level.len(), 1);
    let root = &tree.top_level[0];
    assert_eq!(root.id, 5);
    assert_levels(root, 1);
    // 5 -> 9 -> {7, 10}
    assert_eq!(tree.nodes[&9].level, 2);
    assert_eq!(tree.nodes[&7].level, 3);
    assert_eq!(tree.nodes[&10].level, 3);
    assert_eq!(tree.all_nodes().len(), 4, "no node dropped");
}

#[test]
fn self_parent_is_a_root() {
    let tree = CategoryTree::from_records(vec![record(3, "Loop", Some(3), None)]);
    assert_eq!(tree.top_level.len(), 1);
    assert_eq!(tree.top_level[0].level, 1);
}

#[test]
fn derived_fields_come_from_metadata() {
    let tree = CategoryTree::from_records(vec![
        with_metadata(
            record(1, "Shoes", None, None),
            json!({
                "legacy_id": "L-1",
                "magento_entity_id": "41",
                "image": "shoes.png",
                "is_active": "false"
            }),
        ),
        with_metadata(record(2, "Bags", None, None), json!({ "magento_id": 77 })),
        with_metadata(
            record(3, "Hats", None, None),
            json!({ "url_path": "accessories/hats" }),
        ),
    ]);

    let shoes = &tree.nodes[&1];
    assert_eq!(shoes.entity_id, "41", "key priority, not map order");
    assert_eq!(shoes.image.as_deref(), Some("shoes.png"));
    assert_eq!(shoes.url_path.as_deref(), Some("/category/shoes"));
    assert!(!shoes.is_active, "metadata overrides stored flag");

    let bags = &tree.nodes[&2];
    assert_eq!(bags.entity_id, "2", "non-string ids fall back to local id");

    let hats = &tree.nodes[&3];
    assert_eq!(hats.url_path.as_deref(), Some("accessories/hats"));
}

#[test]
fn node_map_carries_subtrees() {
    let tree = CategoryTree::from_records(vec![
        record(1, "Root", None, None),
        record(2, "Shoes", Some(1), None),
        record(3, "Boots", Some(2), None),
    ]);
    assert_eq!(tree.nodes[&2].children.len(), 1);
    assert_eq!(tree.nodes[&2].children[0].id, 3);
}

#[tokio::test]
async fn builder_reads_only_live_rows() {
    let store = MemoryCatalogStore::new();
    let mut ids = Vec::new();
    for (external_id, name) in [("1", "Root"), ("2", "Gone")] {
        let id = store
            .insert_category(&catbridge_core::NewCategory {
                external_id: external_id.to_string(),
                name: name.to_string(),
                handle: name.to_lowercase(),
                parent_id: None,
                rank: None,
                level: None,
                is_active: true,
                metadata: Metadata::new(),
            })
            .await
            .expect("insert");
        ids.push(id);
    }
    store.soft_delete_category(ids[1]).expect("delete");

    let tree = CategoryTreeBuilder::new(&store)
        .build()
        .await
        .expect("build");
    assert_eq!(tree.nodes.len(), 1);
    assert_eq!(tree.top_level[0].name, "Root");
}
