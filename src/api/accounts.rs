//! Registration, login, profile and admin user management.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use validator::Validate;
use crate::auth::{hash_password_blocking, issue_session, verify_password_blocking, AuthError};
use crate::domain::aggregates::customer::{normalize_email, MIN_PASSWORD_LEN};
use crate::domain::aggregates::{CustomerRow, Profile, ProfileUpdate, Registration, Role};
use super::{conflict_on_duplicate, AdminUser, ApiError, AppState, AuthUser, JsonBody};

const USER_LIST_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    pub current: String,
    pub new: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: Profile,
}

pub async fn register(State(s): State<AppState>, JsonBody(body): JsonBody<Registration>) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    // self-registration never grants admin
    let reg = Registration { role: Role::Customer, ..body }.normalized();
    let row = create_account(&s, reg).await?;
    let token = issue_session(&s.store, row.id, s.config.session_ttl_hours).await?;
    info!(customer_id = row.id, "customer registered");
    Ok((StatusCode::CREATED, Json(SessionResponse { token, user: Profile::from(row) })))
}

pub async fn login(State(s): State<AppState>, JsonBody(body): JsonBody<Credentials>) -> Result<Json<SessionResponse>, ApiError> {
    let row = s
        .store
        .find_customer_by_email(&normalize_email(&body.email))
        .await?
        .ok_or(AuthError::InvalidCredentials)?;
    let Some(stored) = row.password_hash.clone() else { return Err(AuthError::InvalidCredentials.into()) };
    if !verify_password_blocking(body.password, stored).await {
        return Err(AuthError::InvalidCredentials.into());
    }
    let token = issue_session(&s.store, row.id, s.config.session_ttl_hours).await?;
    Ok(Json(SessionResponse { token, user: Profile::from(row) }))
}

pub async fn me(user: AuthUser, State(s): State<AppState>) -> Result<Json<Profile>, ApiError> {
    let row = s.store.find_customer(user.id).await?.ok_or_else(|| ApiError::not_found("customer not found"))?;
    Ok(Json(Profile::from(row)))
}

pub async fn update_profile(user: AuthUser, State(s): State<AppState>, JsonBody(body): JsonBody<ProfileUpdate>) -> Result<Json<Profile>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::bad_request("nothing to update"));
    }
    let current = s.store.find_customer(user.id).await?.ok_or_else(|| ApiError::not_found("customer not found"))?;
    let (first_name, phone) = body.apply(&current).map_err(ApiError::bad_request)?;
    s.store.update_profile(user.id, &first_name, phone.as_deref()).await?;
    let row = s.store.find_customer(user.id).await?.ok_or_else(|| ApiError::not_found("customer not found"))?;
    Ok(Json(Profile::from(row)))
}

pub async fn change_password(user: AuthUser, State(s): State<AppState>, JsonBody(body): JsonBody<PasswordChange>) -> Result<StatusCode, ApiError> {
    if body.new.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!("password must be at least {MIN_PASSWORD_LEN} characters")));
    }
    let row = s.store.find_customer(user.id).await?.ok_or_else(|| ApiError::not_found("customer not found"))?;
    let Some(stored) = row.password_hash else { return Err(AuthError::InvalidCredentials.into()) };
    if !verify_password_blocking(body.current, stored).await {
        return Err(AuthError::InvalidCredentials.into());
    }
    let hash = hash_password_blocking(body.new).await?;
    s.store.set_password_hash(user.id, &hash).await?;
    info!(customer_id = user.id, "password changed");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_users(AdminUser(_): AdminUser, State(s): State<AppState>) -> Result<Json<Vec<Profile>>, ApiError> {
    let rows = s.store.list_customers(USER_LIST_LIMIT).await?;
    Ok(Json(rows.into_iter().map(Profile::from).collect()))
}

/// Admin-created accounts keep the requested role.
pub async fn create_user(AdminUser(admin): AdminUser, State(s): State<AppState>, JsonBody(body): JsonBody<Registration>) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let row = create_account(&s, body.normalized()).await?;
    info!(admin = admin.id, customer_id = row.id, role = %row.role(), "user created");
    Ok((StatusCode::CREATED, Json(json!({ "user": Profile::from(row) }))))
}

async fn create_account(s: &AppState, reg: Registration) -> Result<CustomerRow, ApiError> {
    reg.validate().map_err(ApiError::bad_request)?;
    let hash = hash_password_blocking(reg.password.clone()).await?;
    s.store.create_customer(&reg, &hash).await.map_err(conflict_on_duplicate("email already registered"))
}
