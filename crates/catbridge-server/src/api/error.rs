//! Error responses.
//!
//! Every failure leaves the server as `{ "error": { code, message }, "meta" }`
//! with the status fixed by [`ErrorCode`].

use axum::{
    extract::rejection::BytesRejection,
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use catbridge_core::StoreError;
use catbridge_sync::{ImportError, ResolveError};
use serde::Serialize;

use super::Meta;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    BadRequest,
    NotFound,
    Unauthorized,
    /// The upload body is not a usable CSV or ZIP of CSVs.
    InvalidUpload,
    UploadTooLarge,
    StoreUnavailable,
    Internal,
}

impl ErrorCode {
    #[must_use]
    pub fn status(self) -> StatusCode {
        match self {
            Self::BadRequest | Self::InvalidUpload => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::UploadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    request_id: String,
    code: ErrorCode,
    message: String,
}

impl ApiError {
    pub fn new(request_id: impl Into<String>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            code,
            message: message.into(),
        }
    }

    /// Store internals stay in the log; callers only learn whether the store
    /// is down or a query failed.
    pub(super) fn from_store(request_id: &str, error: &StoreError) -> Self {
        tracing::error!(request_id, error = %error, "catalog store call failed");
        match error {
            StoreError::Unavailable(_) => Self::new(
                request_id,
                ErrorCode::StoreUnavailable,
                "catalog store unavailable",
            ),
            StoreError::Rejected(_) => {
                Self::new(request_id, ErrorCode::Internal, "catalog store query failed")
            }
        }
    }

    pub(super) fn from_resolve(request_id: &str, error: &ResolveError) -> Self {
        match error {
            ResolveError::MissingAccessId(_) | ResolveError::UnknownView(_) => {
                Self::new(request_id, ErrorCode::BadRequest, error.to_string())
            }
            ResolveError::UnknownAccessKey(_) => {
                Self::new(request_id, ErrorCode::NotFound, error.to_string())
            }
            ResolveError::Store(e) => Self::from_store(request_id, e),
        }
    }

    pub(super) fn from_import(request_id: &str, error: &ImportError) -> Self {
        match error {
            ImportError::Upload(e) => Self::new(request_id, ErrorCode::InvalidUpload, e.to_string()),
            ImportError::Store(e) => Self::from_store(request_id, e),
            ImportError::Source(e) => {
                tracing::error!(request_id, error = %e, "source error during upload");
                Self::new(request_id, ErrorCode::Internal, "import failed")
            }
        }
    }

    /// A body the server refused to buffer, usually for exceeding the upload
    /// limit.
    pub(super) fn from_body(request_id: &str, rejection: &BytesRejection) -> Self {
        let code = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ErrorCode::UploadTooLarge
        } else {
            ErrorCode::InvalidUpload
        };
        Self::new(request_id, code, rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorBody<'a>,
    meta: Meta,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: ErrorCode,
    message: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorEnvelope {
            error: ErrorBody {
                code: self.code,
                message: &self.message,
            },
            meta: Meta::new(self.request_id.clone()),
        };
        let mut response = (self.code.status(), Json(body)).into_response();
        if self.code == ErrorCode::Unauthorized {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
