use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Crate-wide error type. Each variant maps to the HTTP status and envelope
/// shape described by the response contract.
#[derive(Debug, Clone)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    Store(String),
    /// Raised by a qualitative-labeling collaborator; nothing in this crate
    /// raises it directly today, but handlers are written against it so the
    /// collaborator seam can fail loudly if a future implementation needs to.
    Auth(String),
    /// The request's connection was dropped mid-computation; no body is sent.
    Cancelled,
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "validation error: {msg}"),
            AppError::NotFound(msg) => write!(f, "not found: {msg}"),
            AppError::Store(msg) => write!(f, "store error: {msg}"),
            AppError::Auth(msg) => write!(f, "auth error: {msg}"),
            AppError::Cancelled => write!(f, "request cancelled"),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": message, "success": false })),
            )
                .into_response(),
            AppError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": message, "success": false })),
            )
                .into_response(),
            AppError::Store(message) => {
                tracing::error!(%message, "store operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "internal error", "success": false })),
                )
                    .into_response()
            }
            AppError::Auth(message) => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": message, "success": false })),
            )
                .into_response(),
            AppError::Cancelled => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}
