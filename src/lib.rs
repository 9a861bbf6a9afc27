//! ModaNova Storefront
//!
//! Self-hosted storefront for a single clothing shop.
//!
//! ## Features
//! - Product catalog with categories and images
//! - Product and category discounts with one shared price resolver
//! - Transactional checkout with row-level stock locking
//! - Order history and admin status management
//! - Customer accounts with bearer sessions

pub mod api;
pub mod auth;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{CheckoutError, OrderService, RejectionKind};
pub use config::Config;
pub use domain::pricing::{effective_price, DiscountTerms, PriceQuote};
pub use store::{CheckoutStore, CheckoutTx, PgStore, StoreError};
