use std::sync::Arc;

use reserva_core::{Clock, DomainError, DomainResult, Reference, Window};
use reserva_inventory::{StockLevel, StockPolicy, available};
use reserva_products::Resource;

use crate::ledger_store::{LedgerRead, LedgerStore};

/// Answers "is quantity Q free during `[from, until)`?" for a single resource.
///
/// Always recomputed from ledger entries; never cached. Reads through the
/// store are non-blocking and may be stale; reads through an open transaction
/// see that transaction's staged writes.
pub struct AvailabilityEngine<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for AvailabilityEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: LedgerStore> AvailabilityEngine<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// `capacity - claimed` for `window` (`UNLIMITED` when stock is untracked).
    pub fn available(&self, resource: &Resource, window: Option<&Window>) -> DomainResult<i64> {
        self.available_in(self.store.as_ref(), resource, window, &[])
    }

    pub fn is_available(
        &self,
        resource: &Resource,
        quantity: i64,
        window: Option<&Window>,
    ) -> DomainResult<bool> {
        Ok(self.available(resource, window)? >= quantity)
    }

    pub fn stock_level(&self, resource: &Resource, window: Option<&Window>) -> DomainResult<StockLevel> {
        let entries = self.store.entries_for(resource.id_typed())?;
        Ok(StockLevel::compute(
            &StockPolicy::from(resource),
            &entries,
            window,
            self.clock.now(),
        ))
    }

    /// Availability as seen by `view`, ignoring claims owned by `excluding`.
    pub fn available_in<R: LedgerRead + ?Sized>(
        &self,
        view: &R,
        resource: &Resource,
        window: Option<&Window>,
        excluding: &[Reference],
    ) -> DomainResult<i64> {
        if resource.is_pool() {
            return Err(DomainError::validation(
                "pool availability is the sum of its members; ask the pool allocator",
            ));
        }
        let entries = view.entries_for(resource.id_typed())?;
        Ok(available(
            &StockPolicy::from(resource),
            &entries,
            window,
            self.clock.now(),
            excluding,
        ))
    }
}
