//! Category import from the live nested tree endpoint, served by `wiremock`.

use catbridge_core::{CatalogStore, Metadata, NewCategory};
use catbridge_magento::MagentoClient;
use catbridge_sync::{BatchImporter, CategoryTreeSource, ImportSettings, MemoryCatalogStore};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(base_url: &str) -> MagentoClient {
    MagentoClient::new(base_url, None, 5, "catbridge-test/0.1", 0, 0)
        .expect("failed to build test MagentoClient")
}

#[tokio::test]
async fn tree_endpoint_is_flattened_and_imported_parents_first() {
    let server = MockServer::start().await;

    // Children carry neither parent_id nor level, as Magento omits them on
    // some store views.
    Mock::given(method("GET"))
        .and(path("/rest/V1/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1, "parent_id": 0, "name": "Root", "level": 1,
            "children_data": [
                { "id": 12, "name": "Women", "children_data": [
                    { "id": 30, "name": "Shoes", "children_data": [] }
                ] },
                { "id": 11, "name": "Men", "children_data": [] }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = MemoryCatalogStore::new();
    let importer = BatchImporter::new(&store, ImportSettings::default());
    let source = CategoryTreeSource::new(client(&server.uri()), &store);

    let result = importer.run(&source).await.expect("import");

    assert!(result.errors.is_empty(), "errors: {:?}", result.errors);
    assert_eq!(result.categories, 4);

    let women = store
        .find_category_by_external_id("12")
        .await
        .expect("find")
        .expect("exists");
    let shoes = store
        .find_category_by_external_id("30")
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(shoes.parent_id, Some(women.id));
    assert_eq!(shoes.level, Some(3));
}

async fn mount_store_root(server: &MockServer) {
    // The shape Magento returns: the store root under a Root Catalog (id 1)
    // that is not part of the response.
    Mock::given(method("GET"))
        .and(path("/rest/V1/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 2, "parent_id": 1, "name": "Default Category", "level": 1,
            "children_data": [
                { "id": 12, "parent_id": 2, "name": "Women", "level": 2,
                  "children_data": [
                    { "id": 30, "parent_id": 12, "name": "Shoes", "level": 3 }
                  ] }
            ]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn store_root_without_imported_parent_becomes_top_level() {
    let server = MockServer::start().await;
    mount_store_root(&server).await;

    let store = MemoryCatalogStore::new();
    let importer = BatchImporter::new(&store, ImportSettings::default());
    let source = CategoryTreeSource::new(client(&server.uri()), &store);

    let result = importer.run(&source).await.expect("import");

    assert!(result.errors.is_empty(), "errors: {:?}", result.errors);
    assert_eq!(result.categories, 3);
    assert_eq!(store.list_categories().await.expect("list").len(), 3);

    let root = store
        .find_category_by_external_id("2")
        .await
        .expect("find")
        .expect("exists");
    let women = store
        .find_category_by_external_id("12")
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(root.parent_id, None);
    assert_eq!(women.parent_id, Some(root.id));
}

#[tokio::test]
async fn store_root_keeps_an_already_imported_parent() {
    let server = MockServer::start().await;
    mount_store_root(&server).await;

    let store = MemoryCatalogStore::new();
    let root_catalog = store
        .insert_category(&NewCategory {
            external_id: "1".to_string(),
            name: "Root Catalog".to_string(),
            handle: "root-catalog".to_string(),
            parent_id: None,
            rank: None,
            level: Some(0),
            is_active: true,
            metadata: Metadata::new(),
        })
        .await
        .expect("insert");
    let importer = BatchImporter::new(&store, ImportSettings::default());
    let source = CategoryTreeSource::new(client(&server.uri()), &store);

    let result = importer.run(&source).await.expect("import");

    assert!(result.errors.is_empty(), "errors: {:?}", result.errors);
    let root = store
        .find_category_by_external_id("2")
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(root.parent_id, Some(root_catalog));
}

#[tokio::test]
async fn tree_endpoint_failure_aborts_the_import() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/V1/categories"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = MemoryCatalogStore::new();
    let importer = BatchImporter::new(&store, ImportSettings::default());
    let source = CategoryTreeSource::new(client(&server.uri()), &store);

    assert!(importer.run(&source).await.is_err());
    assert!(store.list_categories().await.expect("list").is_empty());
}
