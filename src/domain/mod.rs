//! Storefront domain: value objects, aggregates and price resolution.
pub mod aggregates;
pub mod pricing;
pub mod value_objects;
