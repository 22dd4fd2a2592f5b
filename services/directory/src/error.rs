//! Custom error types for the directory service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::StorageError;
use serde_json::json;
use thiserror::Error;

/// Authentication failure cases
///
/// Every case surfaces as the same 401 with a generic message so a caller
/// cannot distinguish unknown users from bad or expired tokens.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    /// No Authorization header, or one that is not a bearer token
    #[error("missing credentials")]
    MissingCredentials,

    /// Signature, structure, or expiry check failed
    #[error("invalid token")]
    InvalidToken,

    /// Token verified but its subject no longer exists in the store
    #[error("unknown subject")]
    UnknownSubject,

    /// Username/password pair did not match a stored user
    #[error("bad credentials")]
    BadCredentials,
}

/// Custom error type for the directory API
#[derive(Error, Debug)]
pub enum ApiError {
    /// Bad or missing input shape
    #[error("Validation error: {0}")]
    Validation(String),

    /// Authentication failure
    #[error("Unauthorized")]
    Auth(#[from] AuthError),

    /// Role or visibility check failed
    #[error("Forbidden: {0}")]
    Permission(String),

    /// Self-deletion, last-admin deletion, and similar state conflicts
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Referenced entity absent
    #[error("{0} not found")]
    NotFound(String),

    /// Durable-store failure
    #[error("Storage error")]
    Storage(#[from] StorageError),

    /// Internal server error
    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Storage(ref e) = self {
            tracing::error!("Storage failure: {}", e);
        }

        let (status, error_message) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Auth(_) => (StatusCode::UNAUTHORIZED, "invalid credentials".to_string()),
            ApiError::Permission(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Conflict(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            ApiError::Storage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Storage error".to_string(),
            ),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
