//! Import into the in-memory store, then read the catalog back out.

use catbridge_core::{AccessMapping, CatalogStore};
use catbridge_magento::{MagentoCategory, MagentoProduct};
use catbridge_sync::{
    BatchImporter, CatalogExportFormatter, CatalogResolver, CatalogView, CategoryTreeBuilder,
    ImportSettings, JsonFileSource, MemoryCatalogStore, ResolvedCatalog,
};
use serde_json::json;

fn category_source() -> JsonFileSource<MagentoCategory> {
    let tree: MagentoCategory = serde_json::from_value(json!({
        "id": 1, "parent_id": 0, "name": "Root", "is_active": true,
        "children_data": [
            { "id": 41, "parent_id": 1, "name": "Shoes", "position": 2,
              "custom_attributes": [ { "attribute_code": "url_path", "value": "shoes" } ],
              "children_data": [
                  { "id": 57, "parent_id": 41, "name": "Boots", "position": 1 }
              ] },
            { "id": 42, "parent_id": 1, "name": "Bags", "position": 1 }
        ]
    }))
    .expect("category fixture");
    JsonFileSource::from_records(vec![tree])
}

#[tokio::test]
async fn root_and_shoes_round_trip_to_legacy_shape() {
    let store = MemoryCatalogStore::new();
    let importer = BatchImporter::new(&store, ImportSettings::default());

    let result = importer.run(&category_source()).await.expect("import");
    assert_eq!(result.categories, 4);
    assert!(result.errors.is_empty());

    let tree = CategoryTreeBuilder::new(&store).build().await.expect("tree");
    assert_eq!(tree.top_level.len(), 1);
    let root = &tree.top_level[0];
    assert_eq!(root.entity_id, "1");
    assert_eq!(root.level, 1);

    let names: Vec<&str> = root.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Bags", "Shoes"], "children ordered by rank");

    let shoes = root
        .children
        .iter()
        .find(|c| c.name == "Shoes")
        .expect("shoes node");
    assert_eq!(shoes.level, 2);
    assert_eq!(shoes.children[0].level, 3);

    let formatter = CatalogExportFormatter::new(&tree.nodes);
    let legacy = formatter.to_legacy_shape(shoes);
    assert_eq!(legacy.parent_id.as_deref(), Some(root.entity_id.as_str()));
    assert_eq!(legacy.entity_id, "41");
    assert_eq!(legacy.url_path.as_deref(), Some("shoes"));
    assert_eq!(legacy.children_count, 1);
    assert_eq!(legacy.children_data[0].parent_id.as_deref(), Some("41"));
}

#[tokio::test]
async fn reimport_keeps_ids_and_slugs() {
    let store = MemoryCatalogStore::new();
    let importer = BatchImporter::new(&store, ImportSettings::default());
    importer.run(&category_source()).await.expect("first import");
    let mut before = store.list_categories().await.expect("list");

    let again = importer.run(&category_source()).await.expect("second import");
    assert_eq!(again.created, 0);
    assert_eq!(again.updated, 4);

    let mut after = store.list_categories().await.expect("list");
    before.sort_by_key(|c| c.id);
    after.sort_by_key(|c| c.id);
    assert_eq!(before, after);
}

#[tokio::test]
async fn products_link_to_imported_categories_and_resolve_by_brand() {
    let store = MemoryCatalogStore::with_access_mappings([AccessMapping {
        access_key: "shoes-only".to_string(),
        brand_ids: ["41".to_string()].into_iter().collect(),
    }]);
    let importer = BatchImporter::new(&store, ImportSettings::default());
    importer.run(&category_source()).await.expect("categories");

    let products: Vec<MagentoProduct> = serde_json::from_value(json!([
        { "id": 10, "sku": "BOOT-1", "name": "Red Shoes!!", "price": 89.5, "status": 1,
          "extension_attributes": { "category_links": [ { "category_id": "57" }, { "category_id": "999" } ] } },
        { "id": 11, "sku": "BOOT-2", "name": "Red Shoes" }
    ]))
    .expect("product fixture");
    let result = importer
        .run(&JsonFileSource::from_records(products))
        .await
        .expect("products");
    assert_eq!(result.products, 2);
    assert_eq!(result.warnings.len(), 1, "unknown category 999 is a warning");

    let slugs: Vec<String> = store
        .products()
        .expect("products")
        .into_iter()
        .map(|p| p.slug)
        .collect();
    assert_eq!(slugs, vec!["red-shoes", "red-shoes-1"]);

    let resolved = CatalogResolver::new(&store)
        .resolve(CatalogView::Brand, Some("shoes-only"))
        .await
        .expect("resolve");
    let ResolvedCatalog::Legacy(items) = resolved else {
        panic!("brand view renders legacy categories");
    };
    let names: Vec<&str> = items.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Shoes"]);
}
