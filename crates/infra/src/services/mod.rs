//! Reservation services: the orchestration layer over the ledger and catalog ports.
//!
//! Call flow: line evaluator → pool allocator (pools) → availability engine →
//! stock ledger. The pricing resolver is shared by the allocator and the
//! evaluator. Only the stock ledger and the allocator write to the ledger.

pub mod availability;
pub mod line_evaluator;
pub mod pool_allocator;
pub mod pricing;
pub mod stock_ledger;

use std::sync::Arc;

use reserva_core::Clock;

use crate::config::ReservationConfig;

pub use availability::AvailabilityEngine;
pub use line_evaluator::LineEvaluator;
pub use pool_allocator::{Allocation, PoolAllocator, ReallocationReport};
pub use pricing::{PricingResolver, Quote};
pub use stock_ledger::StockLedger;

/// Shared handles every service is built from.
pub struct EngineContext<S, C> {
    pub store: Arc<S>,
    pub catalog: Arc<C>,
    pub clock: Arc<dyn Clock>,
    pub config: ReservationConfig,
}

impl<S, C> EngineContext<S, C> {
    pub fn new(
        store: Arc<S>,
        catalog: Arc<C>,
        clock: Arc<dyn Clock>,
        config: ReservationConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            clock,
            config,
        }
    }
}

impl<S, C> Clone for EngineContext<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            catalog: Arc::clone(&self.catalog),
            clock: Arc::clone(&self.clock),
            config: self.config.clone(),
        }
    }
}
