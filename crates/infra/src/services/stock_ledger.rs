use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use reserva_core::{Clock, DomainResult, Reference, ResourceId, Window};
use reserva_inventory::{
    LedgerEntry, Movement, StockPolicy, capacity, claimed_quantity, plan_movement,
};
use reserva_products::Resource;

use crate::ledger_store::{LedgerRead, LedgerStore, LedgerTransaction};

/// Append-only stock ledger service.
///
/// The sole mutator of capacity state. Every write runs inside a
/// [`LedgerTransaction`] scoped to the resources it touches.
pub struct StockLedger<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for StockLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: LedgerStore> StockLedger<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Append a movement in its own transaction.
    ///
    /// For a claim, the returned entry is the CLAIM half of the pair.
    pub fn record_movement(&self, resource: &Resource, movement: Movement) -> DomainResult<LedgerEntry> {
        let mut tx = self.store.begin(&[resource.id_typed()])?;
        let entry = self.record_in(&mut tx, resource, &movement)?;
        tx.commit()?;
        Ok(entry)
    }

    /// Append a movement inside a caller-owned transaction.
    ///
    /// The capacity check reads through `tx`, so earlier staged writes in the
    /// same transaction are accounted for.
    pub fn record_in<T: LedgerTransaction>(
        &self,
        tx: &mut T,
        resource: &Resource,
        movement: &Movement,
    ) -> DomainResult<LedgerEntry> {
        let id = resource.id_typed();
        let entries = tx.entries_for(id)?;
        let planned = plan_movement(id, &StockPolicy::from(resource), &entries, movement, self.now())?;
        let primary = planned.primary.clone();
        for entry in planned.into_entries() {
            tx.append(entry)?;
        }
        debug!(
            resource = %id,
            kind = ?movement.kind,
            quantity = movement.quantity,
            "stock movement staged"
        );
        Ok(primary)
    }

    /// Mark every PENDING claim owned by `reference` COMPLETED.
    ///
    /// Idempotent: a second call finds nothing pending and returns 0.
    pub fn release(&self, reference: &Reference) -> DomainResult<usize> {
        let resources = self
            .store
            .resources_with_pending_claims(&|e| e.is_owned_by(reference))?;
        self.release_on(&resources, reference)
    }

    /// Release `reference`'s claims, limited to `resources`.
    pub fn release_on(&self, resources: &[ResourceId], reference: &Reference) -> DomainResult<usize> {
        if resources.is_empty() {
            return Ok(0);
        }
        let mut tx = self.store.begin(resources)?;
        let mut released = 0;
        for resource in resources {
            released += Self::release_in(&mut tx, *resource, reference)?;
        }
        tx.commit()?;
        if released > 0 {
            info!(%reference, released, "claims released");
        }
        Ok(released)
    }

    pub fn release_in<T: LedgerTransaction>(
        tx: &mut T,
        resource: ResourceId,
        reference: &Reference,
    ) -> DomainResult<usize> {
        tx.complete_claims(resource, &|e| e.is_owned_by(reference))
    }

    /// Permanent stock level.
    pub fn capacity(&self, resource: ResourceId) -> DomainResult<i64> {
        Ok(capacity(&self.store.entries_for(resource)?))
    }

    /// Units held by active claims overlapping `window` (unbounded when `None`).
    pub fn claimed_quantity(&self, resource: ResourceId, window: Option<&Window>) -> DomainResult<i64> {
        let entries = self.store.entries_for(resource)?;
        Ok(claimed_quantity(&entries, window, self.now(), &[]))
    }

    /// Housekeeping: flip PENDING claims whose window has ended to COMPLETED.
    ///
    /// Availability already ignores expired claims; this only tidies history.
    pub fn sweep_expired(&self) -> DomainResult<usize> {
        let now = self.now();
        let expired = |e: &LedgerEntry| !e.is_active_claim(now);
        let resources = self.store.resources_with_pending_claims(&expired)?;
        if resources.is_empty() {
            return Ok(0);
        }
        let mut tx = self.store.begin(&resources)?;
        let mut swept = 0;
        for resource in &resources {
            swept += tx.complete_claims(*resource, &expired)?;
        }
        tx.commit()?;
        info!(swept, "expired claims swept");
        Ok(swept)
    }
}
