//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{CartError, DomainError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::CartNotFound { .. } | DomainError::ProductNotFound { .. } => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        DomainError::Cart(cart_err) => match cart_err {
            CartError::ProductNotInCart { .. } => (StatusCode::NOT_FOUND, err.to_string()),
            CartError::InvalidQuantity { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        },
        DomainError::Store(store_err) => {
            // Store failures surface as 500 with the detail logged, never
            // leaked to the client.
            tracing::error!(error = %store_err, "cart store failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "cart store unavailable".to_string(),
            )
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}
