//! Catalog product routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use crate::domain::aggregates::{DiscountUpdate, ProductPayload, ProductView};
use super::{conflict_on_duplicate, flag, positive_id, AdminUser, ApiError, AppState, JsonBody};

#[derive(Debug, Deserialize)]
pub struct ListParams { pub all: Option<String>, pub category_id: Option<String> }

#[derive(Debug, Serialize)]
pub struct BulkUpdated { pub updated: u64 }

pub async fn list(State(s): State<AppState>, Query(p): Query<ListParams>) -> Result<Json<Vec<ProductView>>, ApiError> {
    // an unusable category filter is ignored rather than rejected
    let category_id = p.category_id.as_deref().and_then(|raw| raw.trim().parse::<i64>().ok()).filter(|id| *id > 0);
    let rows = s.store.list_products(flag(p.all.as_deref()), category_id).await?;
    Ok(Json(rows.into_iter().map(ProductView::from).collect()))
}

pub async fn get(State(s): State<AppState>, Path(id): Path<i64>) -> Result<Json<ProductView>, ApiError> {
    let id = positive_id(id)?;
    s.store.get_product(id).await?.map(|row| Json(ProductView::from(row))).ok_or_else(|| ApiError::not_found("product not found"))
}

pub async fn create(AdminUser(admin): AdminUser, State(s): State<AppState>, JsonBody(body): JsonBody<ProductPayload>) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let draft = body.into_draft(&s.config.currency).map_err(ApiError::bad_request)?;
    let id = s.store.create_product(&draft).await.map_err(conflict_on_duplicate("SKU already exists"))?;
    info!(admin = admin.id, product_id = id, sku = %draft.sku, "product created");
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

pub async fn update(AdminUser(admin): AdminUser, State(s): State<AppState>, Path(id): Path<i64>, JsonBody(body): JsonBody<ProductPayload>) -> Result<Json<serde_json::Value>, ApiError> {
    let id = positive_id(id)?;
    let draft = body.into_draft(&s.config.currency).map_err(ApiError::bad_request)?;
    if !s.store.update_product(id, &draft).await.map_err(conflict_on_duplicate("SKU already exists"))? {
        return Err(ApiError::not_found("product not found"));
    }
    info!(admin = admin.id, product_id = id, "product updated");
    Ok(Json(json!({ "id": id })))
}

pub async fn deactivate(AdminUser(admin): AdminUser, State(s): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    let id = positive_id(id)?;
    if !s.store.deactivate_product(id).await? { return Err(ApiError::not_found("product not found")); }
    info!(admin = admin.id, product_id = id, "product deactivated");
    Ok(StatusCode::NO_CONTENT)
}

/// Sets (or clears) the own discount of every product in the catalog.
pub async fn discount_all(AdminUser(admin): AdminUser, State(s): State<AppState>, JsonBody(body): JsonBody<DiscountUpdate>) -> Result<Json<BulkUpdated>, ApiError> {
    let terms = body.into_terms().map_err(ApiError::bad_request)?;
    let updated = s.store.apply_discount_to_all_products(terms).await?;
    info!(admin = admin.id, updated, active = terms.active, "bulk product discount applied");
    Ok(Json(BulkUpdated { updated }))
}
