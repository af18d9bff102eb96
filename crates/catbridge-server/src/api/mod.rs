mod catalog;
mod error;
mod imports;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderName, Method, StatusCode},
    routing::{get, post},
    Extension, Json, Router,
};
use catbridge_core::CatalogStore;
use catbridge_sync::ImportSettings;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{request_id, require_api_key, ApiKeys, RequestId, REQUEST_ID_HEADER};

pub use error::{ApiError, ErrorCode};

/// Whole ZIP archives arrive in one body, so the axum default of 2 MiB is
/// too small.
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CatalogStore>,
    /// Set for the Postgres backend. Health checks ping it and uploads are
    /// recorded in its `import_runs` table.
    pub pool: Option<PgPool>,
    pub import_settings: ImportSettings,
    pub max_upload_bytes: usize,
}

/// Success body: `{ "data": ..., "meta": { request_id, timestamp } }`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    data: T,
    meta: Meta,
}

impl<T: Serialize> Envelope<T> {
    fn new(data: T, request_id: &RequestId) -> Json<Self> {
        Json(Self {
            data,
            meta: Meta::new(request_id.0.clone()),
        })
    }
}

#[derive(Debug, Serialize)]
struct Meta {
    request_id: String,
    timestamp: DateTime<Utc>,
}

impl Meta {
    fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(REQUEST_ID_HEADER),
            HeaderName::from_static(imports::FILENAME_HEADER),
        ])
}

pub fn build_app(state: AppState, keys: ApiKeys) -> Router {
    let catalog = Router::new()
        .route("/api/v1/catalog/categories", get(catalog::list_categories))
        .route(
            "/api/v1/imports/descriptions",
            post(imports::upload_descriptions)
                .layer(DefaultBodyLimit::max(state.max_upload_bytes)),
        )
        .route_layer(axum::middleware::from_fn_with_state(keys, require_api_key));

    Router::new()
        .route("/api/v1/health", get(health))
        .merge(catalog)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    store: &'static str,
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> (StatusCode, Json<Envelope<Health>>) {
    let (code, health) = match &state.pool {
        None => (
            StatusCode::OK,
            Health {
                status: "ok",
                store: "memory",
            },
        ),
        Some(pool) => match catbridge_db::ping(pool).await {
            Ok(()) => (
                StatusCode::OK,
                Health {
                    status: "ok",
                    store: "ok",
                },
            ),
            Err(e) => {
                tracing::warn!(error = %e, "health check: database unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Health {
                        status: "degraded",
                        store: "unavailable",
                    },
                )
            }
        },
    };
    (code, Envelope::new(health, &req_id))
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
