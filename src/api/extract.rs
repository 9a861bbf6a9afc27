//! Request extractors for authenticated callers.

use async_trait::async_trait;
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use crate::auth::{bearer_token, AuthError, SessionToken};
use crate::domain::aggregates::Role;
use super::{ApiError, AppState};

/// JSON request body whose rejections render as [`ApiError`] (400 with a JSON message).
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// A caller holding a live session.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: i64,
    pub role: Role,
}

/// A caller holding a live session with the admin role. Every admin
/// mutation takes this extractor.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::MissingToken)?;
        let token = bearer_token(header).ok_or(AuthError::MissingToken)?;
        let customer = state
            .store
            .session_customer(&SessionToken::digest(token))
            .await
            .map_err(AuthError::from)?
            .ok_or(AuthError::InvalidSession)?;
        Ok(AuthUser { id: customer.id, role: customer.role() })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            return Err(AuthError::Forbidden.into());
        }
        Ok(AdminUser(user))
    }
}
