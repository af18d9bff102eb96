use axum::{
    extract::{Query, State},
    Extension, Json,
};
use catbridge_sync::{CatalogResolver, CatalogView, ResolvedCatalog};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{ApiError, AppState, Envelope};

#[derive(Debug, Deserialize)]
pub(super) struct CategoriesQuery {
    /// `all`, `category` or `brand`; defaults to `category`.
    pub category_type: Option<String>,
    pub access_id: Option<String>,
}

pub(super) async fn list_categories(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CategoriesQuery>,
) -> Result<Json<Envelope<ResolvedCatalog>>, ApiError> {
    let view = match query.category_type.as_deref() {
        None | Some("") => CatalogView::Category,
        Some(raw) => raw
            .parse::<CatalogView>()
            .map_err(|e| ApiError::from_resolve(&req_id.0, &e))?,
    };

    let resolved = CatalogResolver::new(state.store.as_ref())
        .resolve(view, query.access_id.as_deref())
        .await
        .map_err(|e| ApiError::from_resolve(&req_id.0, &e))?;

    Ok(Envelope::new(resolved, &req_id))
}
