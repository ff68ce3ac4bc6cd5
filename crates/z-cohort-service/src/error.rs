//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use z_cohort_core::CohortError;
use z_cohort_store::StoreError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid input: out-of-range percent, malformed slug, bad field lengths.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The user is already assigned to the segment.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A unique field (user id, segment slug or name) is taken.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The store could not take a lock in time; the request can be retried.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            Self::InvalidArgument(msg) => (StatusCode::BAD_REQUEST, "invalid_argument", msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            Self::AlreadyExists(msg) => (StatusCode::CONFLICT, "already_exists", msg),
            Self::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", msg),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::NotFound(err.to_string()),
            StoreError::Conflict { .. } => Self::Conflict(err.to_string()),
            StoreError::AlreadyExists { .. } => Self::AlreadyExists(err.to_string()),
            StoreError::InvalidArgument(inner) => inner.into(),
            StoreError::Busy(msg) => Self::Unavailable(msg),
            StoreError::SequenceExhausted { .. } => Self::Internal(err.to_string()),
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<CohortError> for ApiError {
    fn from(err: CohortError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}
