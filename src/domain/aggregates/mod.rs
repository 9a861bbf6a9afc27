//! Aggregates module
pub mod cart;
pub mod category;
pub mod customer;
pub mod order;
pub mod product;

pub use cart::{cart_items, validate_cart, CartError, CartItemRequest, CartLine};
pub use category::{Category, CategoryDraft, CategoryError, CategoryPayload, DiscountUpdate};
pub use customer::{CustomerRow, Profile, ProfileUpdate, Registration, Role};
pub use order::{NewLineItem, Order, OrderLineItem, OrderRow, OrderStatus, PlacedOrder, UnknownStatus};
pub use product::{ProductDraft, ProductError, ProductPayload, ProductRow, ProductView};
