//! Request ids and API-key auth.

use std::{collections::HashSet, sync::Arc};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use catbridge_core::Environment;
use uuid::Uuid;

use crate::api::{ApiError, ErrorCode};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

/// The id of the current request, echoed in `meta.request_id` and the
/// `x-request-id` response header.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Keys accepted as bearer tokens on protected routes. An open set lets
/// every request through.
#[derive(Debug, Clone)]
pub struct ApiKeys(Option<Arc<HashSet<String>>>);

impl ApiKeys {
    /// Keys from `CATBRIDGE_API_KEYS`. Without any, the routes stay open in
    /// development; other environments refuse to start.
    pub fn configured(keys: &[String], env: &Environment) -> anyhow::Result<Self> {
        let keys = Self::new(keys);
        if keys.0.is_some() {
            return Ok(keys);
        }
        if *env == Environment::Development {
            tracing::warn!("CATBRIDGE_API_KEYS not set; catalog routes are open in development");
            return Ok(Self::open());
        }
        anyhow::bail!("CATBRIDGE_API_KEYS is required in {env}")
    }

    /// Blank keys are ignored; if none remain the set is open.
    pub fn new<S: AsRef<str>>(keys: &[S]) -> Self {
        let keys: HashSet<String> = keys
            .iter()
            .map(|k| k.as_ref().trim())
            .filter(|k| !k.is_empty())
            .map(str::to_owned)
            .collect();
        if keys.is_empty() {
            Self(None)
        } else {
            Self(Some(Arc::new(keys)))
        }
    }

    #[must_use]
    pub fn open() -> Self {
        Self(None)
    }

    fn accepts(&self, token: Option<&str>) -> bool {
        match &self.0 {
            None => true,
            Some(keys) => token.is_some_and(|t| keys.contains(t)),
        }
    }
}

/// Takes the caller's `x-request-id` when it is short printable ASCII,
/// otherwise mints a UUID.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| is_usable_request_id(v))
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut res = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}

fn is_usable_request_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN && id.bytes().all(|b| b.is_ascii_graphic())
}

pub async fn require_api_key(State(keys): State<ApiKeys>, req: Request, next: Next) -> Response {
    if keys.accepts(bearer_token(req.headers())) {
        return next.run(req).await;
    }
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    tracing::debug!(
        request_id = %request_id,
        path = %req.uri().path(),
        "rejected request without a valid api key"
    );
    ApiError::new(
        request_id,
        ErrorCode::Unauthorized,
        "missing or invalid bearer token",
    )
    .into_response()
}

/// The credentials of an `Authorization: Bearer <token>` header. The scheme
/// is matched case-insensitively.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let (scheme, token) = headers.get(AUTHORIZATION)?.to_str().ok()?.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
