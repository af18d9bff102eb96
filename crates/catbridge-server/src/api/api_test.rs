use std::collections::BTreeSet;

use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::response::IntoResponse;
use catbridge_core::{AccessMapping, Metadata, NewCategory, NewProduct};
use catbridge_db::PgCatalogStore;
use catbridge_sync::MemoryCatalogStore;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::*;

fn mapping(key: &str, brands: &[&str]) -> AccessMapping {
    AccessMapping {
        access_key: key.to_string(),
        brand_ids: brands.iter().map(|s| (*s).to_string()).collect::<BTreeSet<_>>(),
    }
}

fn entity_metadata(entity_id: &str, brand: Option<&str>) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("magento_entity_id".into(), json!(entity_id));
    if let Some(brand) = brand {
        metadata.insert("brand".into(), json!(brand));
    }
    metadata
}

async fn seeded_store() -> Arc<MemoryCatalogStore> {
    let store = Arc::new(MemoryCatalogStore::with_access_mappings([mapping(
        "eu",
        &["acme"],
    )]));
    let root = store
        .insert_category(&NewCategory {
            external_id: "1".into(),
            name: "Root".into(),
            handle: "root".into(),
            parent_id: None,
            rank: None,
            level: None,
            is_active: true,
            metadata: entity_metadata("1", None),
        })
        .await
        .expect("root");
    for (external_id, name, brand) in [("41", "Acme", Some("acme")), ("42", "Generic", None)] {
        store
            .insert_category(&NewCategory {
                external_id: external_id.into(),
                name: name.into(),
                handle: name.to_lowercase(),
                parent_id: Some(root),
                rank: None,
                level: None,
                is_active: true,
                metadata: entity_metadata(external_id, brand),
            })
            .await
            .expect("child");
    }
    store
        .insert_product(&red_shoe())
        .await
        .expect("product");
    store
}

fn red_shoe() -> NewProduct {
    NewProduct {
        external_id: "10".into(),
        sku: "RS-1".into(),
        name: "Red Shoe".into(),
        slug: "red-shoe".into(),
        description: None,
        price: None,
        status: "enabled".into(),
        type_id: None,
        metadata: Metadata::new(),
    }
}

fn state_with(store: Arc<dyn CatalogStore>, pool: Option<PgPool>) -> AppState {
    AppState {
        store,
        pool,
        import_settings: ImportSettings::default(),
        max_upload_bytes: MAX_UPLOAD_BYTES,
    }
}

fn app_with(store: Arc<MemoryCatalogStore>, keys: ApiKeys) -> Router {
    build_app(state_with(store, None), keys)
}

fn upload_request(body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/imports/descriptions")
        .body(Body::from(body))
        .expect("request")
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = serde_json::from_slice(&body).expect("json parse");
    (status, json)
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

#[tokio::test]
async fn health_reports_memory_store() {
    let app = app_with(seeded_store().await, ApiKeys::open());
    let (status, json) = send(app, get_request("/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["store"], "memory");
    assert!(json["meta"]["request_id"].is_string());
}

#[tokio::test]
async fn request_id_is_echoed() {
    let app = app_with(seeded_store().await, ApiKeys::open());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("req-42")
    );
}

#[tokio::test]
async fn category_view_is_the_default() {
    let app = app_with(seeded_store().await, ApiKeys::open());
    let (status, json) = send(app, get_request("/api/v1/catalog/categories")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["data"],
        json!([{ "entity_id": "1", "name": "Root", "image": null, "url_path": "/category/root" }])
    );
}

#[tokio::test]
async fn all_view_prunes_children_to_the_brand_set() {
    let app = app_with(seeded_store().await, ApiKeys::open());
    let (status, json) = send(
        app,
        get_request("/api/v1/catalog/categories?category_type=all&access_id=eu"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let root = &json["data"][0];
    assert_eq!(root["name"], "Root");
    assert_eq!(root["children_count"], 1);
    assert_eq!(root["children_data"][0]["name"], "Acme");
    assert_eq!(root["children_data"][0]["parent_id"], "1");
}

#[tokio::test]
async fn brand_view_without_access_id_is_bad_request() {
    let app = app_with(seeded_store().await, ApiKeys::open());
    let (status, json) = send(app, get_request("/api/v1/catalog/categories?category_type=brand")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "bad_request");
}

#[tokio::test]
async fn unknown_access_key_is_not_found() {
    let app = app_with(seeded_store().await, ApiKeys::open());
    let (status, json) = send(
        app,
        get_request("/api/v1/catalog/categories?category_type=brand&access_id=nobody"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
}

#[tokio::test]
async fn unknown_category_type_is_bad_request() {
    let app = app_with(seeded_store().await, ApiKeys::open());
    let (status, _) = send(app, get_request("/api/v1/catalog/categories?category_type=tree")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn store_outage_is_service_unavailable() {
    let store = seeded_store().await;
    store.set_unavailable(true);
    let app = app_with(store, ApiKeys::open());
    let (status, json) = send(app, get_request("/api/v1/catalog/categories")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"]["code"], "store_unavailable");
}

#[tokio::test]
async fn protected_routes_require_bearer_token() {
    let auth = ApiKeys::new(&["secret"]);
    let store = seeded_store().await;

    let (status, json) = send(
        app_with(Arc::clone(&store), auth.clone()),
        get_request("/api/v1/catalog/categories"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], "unauthorized");

    let (status, _) = send(
        app_with(Arc::clone(&store), auth.clone()),
        Request::builder()
            .uri("/api/v1/catalog/categories")
            .header("authorization", "Bearer secret")
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(app_with(store, auth), get_request("/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK, "health stays public");
}

#[tokio::test]
async fn description_upload_applies_rows() {
    let store = seeded_store().await;
    let app = app_with(Arc::clone(&store), ApiKeys::open());
    let (status, json) = send(
        app,
        Request::builder()
            .method("POST")
            .uri("/api/v1/imports/descriptions")
            .header("x-filename", "batch.csv")
            .body(Body::from("sku,description\nRS-1,<p>Red</p>\nNOPE,<p>x</p>\n"))
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["descriptions"], 1);
    assert_eq!(json["data"]["skipped"], 1);

    let product = store
        .find_product_by_sku("RS-1")
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(product.description.as_deref(), Some("<p>Red</p>"));
}

#[tokio::test]
async fn unusable_upload_is_an_invalid_upload() {
    let app = app_with(seeded_store().await, ApiKeys::open());
    let (status, json) = send(app, upload_request("code,text\nx,y\n")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "invalid_upload");
    assert!(json["error"]["message"]
        .as_str()
        .is_some_and(|m| m.contains("upload.csv")));
}

#[tokio::test]
async fn oversized_upload_is_rejected_in_the_error_envelope() {
    let mut state = state_with(seeded_store().await, None);
    state.max_upload_bytes = 16;
    let app = build_app(state, ApiKeys::open());

    let (status, json) = send(
        app,
        upload_request("sku,description\nRS-1,<p>far more than sixteen bytes</p>\n"),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json["error"]["code"], "upload_too_large");
    assert!(json["meta"]["request_id"].is_string());
}

#[tokio::test]
async fn rejected_token_gets_bearer_challenge_and_request_id() {
    let app = app_with(seeded_store().await, ApiKeys::new(&["secret"]));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/catalog/categories")
                .header("authorization", "Bearer wrong")
                .header("x-request-id", "req-7")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get("www-authenticate").and_then(|v| v.to_str().ok()),
        Some("Bearer")
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let json: Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(json["meta"]["request_id"], "req-7");
}

#[tokio::test]
async fn unusable_request_id_is_replaced() {
    let app = app_with(seeded_store().await, ApiKeys::open());
    let long = "x".repeat(200);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header("x-request-id", long.as_str())
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    let echoed = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .expect("request id header");
    assert_ne!(echoed, long);
    assert!(!echoed.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn description_upload_is_recorded_as_an_import_run(pool: PgPool) {
    let store = PgCatalogStore::new(pool.clone());
    store.insert_product(&red_shoe()).await.expect("product");
    let app = build_app(state_with(Arc::new(store), Some(pool.clone())), ApiKeys::open());

    let (status, json) = send(app, upload_request("sku,description\nRS-1,<p>Red</p>\n")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["descriptions"], 1);

    let runs = catbridge_db::list_import_runs(&pool, 5).await.expect("runs");
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].entity_kind, "description");
    assert_eq!(runs[0].trigger_source, "api-upload");
    assert_eq!(runs[0].status, "succeeded");
    assert_eq!(runs[0].records_processed, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn rejected_upload_is_recorded_as_a_failed_run(pool: PgPool) {
    let store = PgCatalogStore::new(pool.clone());
    let app = build_app(state_with(Arc::new(store), Some(pool.clone())), ApiKeys::open());

    let (status, _) = send(app, upload_request("code,text\nx,y\n")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let runs = catbridge_db::list_import_runs(&pool, 5).await.expect("runs");
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, "failed");
}

#[test]
fn error_codes_fix_the_status() {
    assert_eq!(ErrorCode::InvalidUpload.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ErrorCode::UploadTooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(ErrorCode::StoreUnavailable.status(), StatusCode::SERVICE_UNAVAILABLE);
    let response = ApiError::new("req-1", ErrorCode::NotFound, "missing").into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().get("www-authenticate").is_none());
}
