use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::HeaderMap,
    Extension, Json,
};
use catbridge_core::{EntityKind, ImportResult};
use catbridge_db::record_import_run;
use catbridge_sync::BatchImporter;

use crate::middleware::RequestId;

use super::{ApiError, AppState, Envelope};

/// Optional request header naming the uploaded file.
pub(super) const FILENAME_HEADER: &str = "x-filename";

const DEFAULT_UPLOAD_NAME: &str = "upload.csv";

/// Applies a raw CSV or ZIP body of product descriptions. With a database
/// attached, each upload is recorded as an import run.
pub(super) async fn upload_descriptions(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Envelope<ImportResult>>, ApiError> {
    let body = body.map_err(|rejection| {
        tracing::warn!(request_id = %req_id.0, error = %rejection, "upload body rejected");
        ApiError::from_body(&req_id.0, &rejection)
    })?;
    let file_name = upload_file_name(&headers);

    let importer = BatchImporter::new(state.store.as_ref(), state.import_settings);
    let result = record_import_run(
        state.pool.as_ref(),
        EntityKind::Description,
        "api-upload",
        importer.import_description_upload(file_name, &body),
    )
    .await
    .map_err(|e| ApiError::from_import(&req_id.0, &e))?;

    tracing::info!(
        request_id = %req_id.0,
        file_name,
        bytes = body.len(),
        descriptions = result.descriptions,
        "description upload applied"
    );
    Ok(Envelope::new(result, &req_id))
}

/// The base name from `x-filename`, so row messages never echo a client
/// path. Falls back to `upload.csv`.
fn upload_file_name(headers: &HeaderMap) -> &str {
    headers
        .get(FILENAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.rsplit(['/', '\\']).next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_UPLOAD_NAME)
}
