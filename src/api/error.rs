//! HTTP error mapping. Internal detail is logged, never returned.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;
use crate::auth::AuthError;
use crate::checkout::{CheckoutError, RejectionKind};
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl ToString) -> Self { Self::BadRequest(msg.to_string()) }
    pub fn not_found(msg: &str) -> Self { Self::NotFound(msg.to_string()) }
}

/// Maps a unique-constraint violation to 409 with `msg`; anything else stays internal.
pub fn conflict_on_duplicate(msg: &'static str) -> impl FnOnce(StoreError) -> ApiError {
    move |err| if err.is_unique_violation() { ApiError::Conflict(msg.to_string()) } else { ApiError::from(err) }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self { ApiError::Internal(err.to_string()) }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidSession | AuthError::InvalidCredentials => {
                ApiError::Unauthorized(err.to_string())
            }
            AuthError::Forbidden => ApiError::Forbidden(err.to_string()),
            AuthError::Hashing(_) | AuthError::Store(_) => ApiError::Internal(err.to_string()),
        }
    }
}

fn checkout_status(err: &CheckoutError) -> StatusCode {
    match err {
        CheckoutError::InvalidCart(_) => StatusCode::BAD_REQUEST,
        CheckoutError::UnknownProduct { .. } => StatusCode::NOT_FOUND,
        CheckoutError::InactiveProduct { .. } | CheckoutError::InsufficientStock { .. } => StatusCode::CONFLICT,
        CheckoutError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m),
            ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m),
            ApiError::Internal(detail) => {
                error!(%detail, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
            }
            ApiError::Checkout(err) => {
                let status = checkout_status(&err);
                let message = match err.kind() {
                    RejectionKind::Infrastructure => {
                        error!(error = %err, "checkout failed");
                        "order could not be placed".to_string()
                    }
                    _ => err.to_string(),
                };
                let body = json!({
                    "message": message,
                    "kind": err.kind(),
                    "product_id": err.product_id(),
                    "line": err.line(),
                });
                return (status, Json(body)).into_response();
            }
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}
