//! Reservable resources and their prices.
//!
//! This crate contains the catalog-side business rules (resource kinds,
//! default-price resolution, pool pricing strategies, booking proration),
//! implemented purely as deterministic domain logic (no IO, no storage).

pub mod membership;
pub mod price;
pub mod pricing;
pub mod resource;
pub mod strategy;

pub use membership::PoolMembership;
pub use price::{Price, resolve_default_price};
pub use pricing::{PriceSource, ResolvedPrice, SECONDS_PER_DAY, booking_line_price};
pub use resource::{Resource, ResourceKind};
pub use strategy::{PricingStrategy, price_aggregate, selection_order};
