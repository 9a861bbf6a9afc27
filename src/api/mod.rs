//! HTTP API: axum router, shared state, extractors and handlers.

pub mod accounts;
pub mod categories;
pub mod error;
pub mod extract;
pub mod orders;
pub mod products;

use std::sync::Arc;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use crate::checkout::OrderService;
use crate::config::Config;
use crate::store::PgStore;

pub use error::{conflict_on_duplicate, ApiError};
pub use extract::{AdminUser, AuthUser, JsonBody};

#[derive(Clone)]
pub struct AppState {
    pub store: PgStore,
    pub orders: Arc<OrderService<PgStore>>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: PgStore, config: Config) -> Self {
        let orders = Arc::new(OrderService::new(store.clone(), config.currency.clone()));
        Self { store, orders, config: Arc::new(config) }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "modanova-storefront"})) }))
        .route("/api/products", get(products::list).post(products::create))
        .route("/api/products/discount/all-products", post(products::discount_all))
        .route("/api/products/:id", get(products::get).put(products::update).delete(products::deactivate))
        .route("/api/categories", get(categories::list).post(categories::create))
        .route("/api/categories/discount/all-categories", post(categories::discount_all))
        .route("/api/categories/:id", put(categories::update))
        .route("/api/categories/:id/discount", post(categories::set_discount))
        .route("/api/auth/register", post(accounts::register))
        .route("/api/auth/login", post(accounts::login))
        .route("/api/auth/me", get(accounts::me))
        .route("/api/auth/profile", put(accounts::update_profile))
        .route("/api/auth/password", put(accounts::change_password))
        .route("/api/orders", get(orders::list_all).post(orders::place))
        .route("/api/orders/mine", get(orders::mine))
        .route("/api/orders/:id/status", put(orders::set_status))
        .route("/api/admin/users", get(accounts::list_users).post(accounts::create_user))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Query flags accept `1` and `true`.
pub(crate) fn flag(raw: Option<&str>) -> bool {
    matches!(raw.map(str::trim), Some(v) if v == "1" || v.eq_ignore_ascii_case("true"))
}

pub(crate) fn positive_id(id: i64) -> Result<i64, ApiError> {
    if id > 0 { Ok(id) } else { Err(ApiError::bad_request("id must be a positive integer")) }
}
