//! API error mapping.
//!
//! Handlers return `Result<_, ApiError>`; every failure renders as a JSON
//! `{"error": message}` body with the matching status code. Absent rows are
//! not errors on the read surface (they serialize as `null` or `[]`), so
//! `NotFound` here only covers resources with a real HTTP identity, such as
//! stored blobs.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use thiserror::Error;

/// HTTP-facing error for the folio API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Infrastructure failure, surfaced as 500.
    #[error("{0}")]
    Internal(folio_core::Error),

    /// Missing or invalid session on a protected operation.
    #[error("{0}")]
    Unauthorized(String),

    /// Resource with an HTTP identity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Request failed validation.
    #[error("{0}")]
    BadRequest(String),
}

impl From<folio_core::Error> for ApiError {
    fn from(err: folio_core::Error) -> Self {
        match &err {
            folio_core::Error::NotFound(msg) => ApiError::NotFound(msg.clone()),
            folio_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg.clone()),
            folio_core::Error::Unauthorized(msg) => ApiError::Unauthorized(msg.clone()),
            _ => ApiError::Internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
