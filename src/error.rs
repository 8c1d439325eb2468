use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure kinds surfaced by the shortening core.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AppError {
    /// Malformed, oversized or unsupported-scheme target URL.
    #[error("{0}")]
    InvalidInput(String),

    /// Identifier absent or malformed.
    #[error("{0}")]
    NotFound(String),

    /// Identifier already present at insert time. Only reachable when the
    /// allocation invariant is broken.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Client exceeded its request quota.
    #[error("{0}")]
    TooManyRequests(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, msg),
            Self::Conflict(msg) => {
                tracing::error!("Identifier conflict: {}", msg);
                (StatusCode::CONFLICT, "Identifier conflict".to_owned())
            }
            Self::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_owned(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
