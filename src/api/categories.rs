//! Category routes and category-level discounts.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;
use tracing::info;
use crate::domain::aggregates::{Category, CategoryPayload, DiscountUpdate};
use super::products::BulkUpdated;
use super::{conflict_on_duplicate, positive_id, AdminUser, ApiError, AppState, JsonBody};

pub async fn list(State(s): State<AppState>) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(s.store.list_categories().await?))
}

pub async fn create(AdminUser(admin): AdminUser, State(s): State<AppState>, JsonBody(body): JsonBody<CategoryPayload>) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let draft = body.into_draft().map_err(ApiError::bad_request)?;
    let id = s.store.create_category(&draft).await.map_err(conflict_on_duplicate("slug already exists"))?;
    info!(admin = admin.id, category_id = id, slug = %draft.slug, "category created");
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

pub async fn update(AdminUser(admin): AdminUser, State(s): State<AppState>, Path(id): Path<i64>, JsonBody(body): JsonBody<CategoryPayload>) -> Result<Json<serde_json::Value>, ApiError> {
    let id = positive_id(id)?;
    let draft = body.into_draft().map_err(ApiError::bad_request)?;
    if !s.store.update_category(id, &draft).await.map_err(conflict_on_duplicate("slug already exists"))? {
        return Err(ApiError::not_found("category not found"));
    }
    info!(admin = admin.id, category_id = id, "category updated");
    Ok(Json(json!({ "id": id })))
}

pub async fn set_discount(AdminUser(admin): AdminUser, State(s): State<AppState>, Path(id): Path<i64>, JsonBody(body): JsonBody<DiscountUpdate>) -> Result<Json<serde_json::Value>, ApiError> {
    let id = positive_id(id)?;
    let terms = body.into_terms().map_err(ApiError::bad_request)?;
    if !s.store.set_category_discount(id, terms).await? {
        return Err(ApiError::not_found("category not found"));
    }
    info!(admin = admin.id, category_id = id, active = terms.active, "category discount set");
    Ok(Json(json!({ "id": id, "discount_pct": terms.pct, "discount_active": terms.active })))
}

pub async fn discount_all(AdminUser(admin): AdminUser, State(s): State<AppState>, JsonBody(body): JsonBody<DiscountUpdate>) -> Result<Json<BulkUpdated>, ApiError> {
    let terms = body.into_terms().map_err(ApiError::bad_request)?;
    let updated = s.store.apply_discount_to_all_categories(terms).await?;
    info!(admin = admin.id, updated, active = terms.active, "bulk category discount applied");
    Ok(Json(BulkUpdated { updated }))
}
