//! Reservation facade (application-level orchestration).
//!
//! `ReservationService` is the single entry point callers use. It resolves
//! resources through the [`Catalog`] port, and routes every request to the
//! service that owns it:
//!
//! ```text
//! add_line / change_window / checkout
//!   ↓
//! PoolAllocator (pool lines)  ─┐
//!   ↓                          ├─ PricingResolver
//! AvailabilityEngine           │
//!   ↓                          │
//! StockLedger (LedgerStore tx) ┘
//!
//! evaluate_line / evaluate_cart → LineEvaluator (read-only)
//! ```
//!
//! ## Error surface
//!
//! - Explicit claims (`claim_pool`, `add_line`, `checkout`) return typed
//!   unavailability errors (`InsufficientCapacity`, `NotEnoughAvailable`).
//! - `change_window` never fails for unavailability; affected lines come back
//!   in the `NOT_READY_*` states and the caller re-evaluates before checkout.
//! - Configuration problems (`PoolHasNoMembers`, `AmbiguousDefaultPrice`)
//!   surface from every operation that touches the misconfigured resource.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use reserva_core::{Clock, DomainError, DomainResult, LineId, Reference, ResourceId, Window};
use reserva_inventory::{LedgerEntry, Movement};
use reserva_products::Resource;
use reserva_sales::{Cart, CartEvaluation, LineEvaluation, ReservationLine};

use crate::catalog::Catalog;
use crate::config::ReservationConfig;
use crate::ledger_store::{InMemoryLedgerStore, LedgerRead, LedgerStore, LedgerTransaction};
use crate::services::{
    AvailabilityEngine, EngineContext, LineEvaluator, PoolAllocator, PricingResolver, Quote,
    ReallocationReport, StockLedger,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityCheck {
    pub available: bool,
    /// Largest quantity that could be claimed right now (`UNLIMITED` when
    /// stock is untracked).
    pub max_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolClaimResult {
    pub allocated_resource_ids: Vec<ResourceId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolReleaseResult {
    pub released_count: usize,
}

/// What a successful checkout converted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutReceipt {
    pub purchase: Reference,
    pub lines: usize,
    pub claims_moved: usize,
    pub total: Option<i64>,
    pub currency: Option<String>,
}

/// Outcome of a cart-wide window change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowChange {
    pub reallocation: ReallocationReport,
    pub evaluation: CartEvaluation,
}

pub struct ReservationService<S, C> {
    ctx: EngineContext<S, C>,
    ledger: StockLedger<S>,
    availability: AvailabilityEngine<S>,
    pricing: PricingResolver<S, C>,
    allocator: PoolAllocator<S, C>,
    evaluator: LineEvaluator<S, C>,
}

impl<C: Catalog> ReservationService<InMemoryLedgerStore, C> {
    /// Service over an in-memory ledger honouring `config.lock_timeout`.
    pub fn in_memory(catalog: Arc<C>, clock: Arc<dyn Clock>, config: ReservationConfig) -> Self {
        let store = Arc::new(InMemoryLedgerStore::with_lock_timeout(config.lock_timeout));
        Self::new(store, catalog, clock, config)
    }
}

impl<S: LedgerStore, C: Catalog> ReservationService<S, C> {
    pub fn new(store: Arc<S>, catalog: Arc<C>, clock: Arc<dyn Clock>, config: ReservationConfig) -> Self {
        Self::from_context(EngineContext::new(store, catalog, clock, config))
    }

    pub fn from_context(ctx: EngineContext<S, C>) -> Self {
        Self {
            ledger: StockLedger::new(ctx.store.clone(), ctx.clock.clone()),
            availability: AvailabilityEngine::new(ctx.store.clone(), ctx.clock.clone()),
            pricing: PricingResolver::new(ctx.clone()),
            allocator: PoolAllocator::new(ctx.clone()),
            evaluator: LineEvaluator::new(ctx.clone()),
            ctx,
        }
    }

    pub fn store(&self) -> Arc<S> {
        Arc::clone(&self.ctx.store)
    }

    pub fn ledger(&self) -> &StockLedger<S> {
        &self.ledger
    }

    pub fn allocator(&self) -> &PoolAllocator<S, C> {
        &self.allocator
    }

    pub fn pricing(&self) -> &PricingResolver<S, C> {
        &self.pricing
    }

    fn resource(&self, id: ResourceId) -> DomainResult<Resource> {
        self.ctx.catalog.resource(id)
    }

    pub fn record_movement(&self, resource: ResourceId, movement: Movement) -> DomainResult<LedgerEntry> {
        let resource = self.resource(resource)?;
        self.ledger.record_movement(&resource, movement)
    }

    /// Can `quantity` of `resource` be claimed for the window right now?
    pub fn check_availability(
        &self,
        resource: ResourceId,
        quantity: i64,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> DomainResult<AvailabilityCheck> {
        let window = Window::from_bounds(from, until)?;
        let resource = self.resource(resource)?;
        let max_quantity = if resource.is_pool() {
            self.allocator.max_available_quantity(&resource, window.as_ref())?
        } else {
            self.availability.available(&resource, window.as_ref())?.max(0)
        };
        Ok(AvailabilityCheck {
            available: max_quantity >= quantity,
            max_quantity,
        })
    }

    pub fn claim_pool(
        &self,
        pool: ResourceId,
        quantity: i64,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        reference: Reference,
    ) -> DomainResult<PoolClaimResult> {
        let window = Window::from_bounds(from, until)?;
        let pool = self.resource(pool)?;
        let allocations = self
            .allocator
            .claim(&pool, quantity, window.as_ref(), reference)?;
        Ok(PoolClaimResult {
            allocated_resource_ids: allocations.into_iter().map(|a| a.resource).collect(),
        })
    }

    pub fn release_pool(&self, pool: ResourceId, reference: &Reference) -> DomainResult<PoolReleaseResult> {
        let pool = self.resource(pool)?;
        Ok(PoolReleaseResult {
            released_count: self.allocator.release(&pool, reference)?,
        })
    }

    /// Release every claim `reference` holds, on any resource.
    pub fn release(&self, reference: &Reference) -> DomainResult<usize> {
        self.ledger.release(reference)
    }

    /// Fails with `NoPriceResolvable` when the resource has no own price and,
    /// for pools, no priced single is available for the window.
    pub fn quote(
        &self,
        resource: ResourceId,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> DomainResult<Quote> {
        let window = Window::from_bounds(from, until)?;
        let resource = self.resource(resource)?;
        self.pricing
            .quote(&resource, window.as_ref())?
            .ok_or(DomainError::NoPriceResolvable(resource.id_typed()))
    }

    pub fn evaluate_line(&self, cart: &Cart, line: LineId) -> DomainResult<LineEvaluation> {
        self.evaluator.evaluate_line(cart, line)
    }

    pub fn evaluate_cart(&self, cart: &Cart) -> DomainResult<CartEvaluation> {
        self.evaluator.evaluate_cart(cart)
    }

    /// Add `quantity` of `resource` to the cart and claim it.
    ///
    /// Pools get one line per unit, each backed by its own single, all
    /// claimed in one transaction. A time-bound request without a window is
    /// added unclaimed and stays `NOT_READY_MISSING_WINDOW` until a window is
    /// set. Returns the new lines' ids.
    pub fn add_line(
        &self,
        cart: &mut Cart,
        resource: ResourceId,
        quantity: i64,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> DomainResult<Vec<LineId>> {
        let window = Window::from_bounds(from, until)?;
        let resource = self.resource(resource)?;
        let time_bound = self.pricing.is_time_bound(&resource)?;

        let mut lines = if resource.is_pool() {
            let mut lines = (0..quantity)
                .map(|_| ReservationLine::new(resource.id_typed(), 1, from, until))
                .collect::<DomainResult<Vec<_>>>()?;
            if lines.is_empty() {
                return Err(DomainError::validation("quantity must be positive"));
            }
            if window.is_some() || !time_bound {
                self.allocator
                    .allocate_lines(&resource, &mut lines, window.as_ref())?;
            }
            lines
        } else {
            let mut line = ReservationLine::new(resource.id_typed(), quantity, from, until)?;
            if window.is_some() || !time_bound {
                self.ledger.record_movement(
                    &resource,
                    Movement::claim(quantity, window, line.reference()),
                )?;
            }
            let price = self.pricing.line_unit_amount(&resource, None, window.as_ref())?;
            line.apply_price(price, time_bound);
            vec![line]
        };

        let ids = lines.iter().map(|l| l.id).collect();
        info!(cart = %cart.id, resource = %resource.id_typed(), quantity, "cart line added");
        cart.lines.append(&mut lines);
        Ok(ids)
    }

    /// Remove a line and release whatever it holds.
    pub fn remove_line(&self, cart: &mut Cart, line: LineId) -> DomainResult<usize> {
        let removed = cart.remove(line).ok_or_else(DomainError::not_found)?;
        self.ledger.release(&removed.reference())
    }

    /// Move every line of the cart to a new window.
    ///
    /// Direct lines are re-claimed, pool lines are reallocated. Unavailability
    /// and malformed bounds never fail the call: the affected lines lose their
    /// claims and prices, and the returned evaluation says why.
    pub fn change_window(
        &self,
        cart: &mut Cart,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> DomainResult<WindowChange> {
        let mut reallocation = ReallocationReport::default();

        let window = match Window::from_bounds(from, until) {
            Ok(window) => window,
            Err(err) => {
                warn!(cart = %cart.id, error = %err, "window rejected; lines released");
                for line in cart.lines.iter_mut() {
                    self.ledger.release(&line.reference())?;
                    line.window_start = from;
                    line.window_end = until;
                    line.mark_unavailable();
                    reallocation.unavailable.push(line.id);
                }
                let evaluation = self.evaluator.evaluate_cart(cart)?;
                return Ok(WindowChange {
                    reallocation,
                    evaluation,
                });
            }
        };

        let mut pools: Vec<ResourceId> = Vec::new();
        for idx in 0..cart.lines.len() {
            let resource = self.resource(cart.lines[idx].resource)?;
            if resource.is_pool() {
                if !pools.contains(&resource.id_typed()) {
                    pools.push(resource.id_typed());
                }
                continue;
            }
            self.reclaim_direct(&resource, &mut cart.lines[idx], window)?;
        }

        for pool_id in pools {
            let pool = self.resource(pool_id)?;
            let positions: Vec<usize> = cart
                .lines
                .iter()
                .enumerate()
                .filter(|(_, l)| l.resource == pool_id)
                .map(|(idx, _)| idx)
                .collect();
            let mut batch: Vec<ReservationLine> =
                positions.iter().map(|idx| cart.lines[*idx].clone()).collect();
            let report = self.allocator.reallocate(&pool, &mut batch, window.as_ref());
            for (idx, line) in positions.into_iter().zip(batch) {
                cart.lines[idx] = line;
            }
            reallocation.kept.extend(report.kept);
            reallocation.moved.extend(report.moved);
            reallocation.unavailable.extend(report.unavailable);
        }

        let evaluation = self.evaluator.evaluate_cart(cart)?;
        info!(cart = %cart.id, ready = evaluation.ready, "cart window changed");
        Ok(WindowChange {
            reallocation,
            evaluation,
        })
    }

    /// Release a direct line's claim and claim it again for `window` in one
    /// transaction. On failure the old claim is still released.
    fn reclaim_direct(
        &self,
        resource: &Resource,
        line: &mut ReservationLine,
        window: Option<Window>,
    ) -> DomainResult<()> {
        let id = resource.id_typed();
        let reference = line.reference();
        let time_bound = resource.requires_window();
        line.set_window(window);

        if window.is_none() && time_bound {
            self.ledger.release_on(&[id], &reference)?;
            let price = self.pricing.effective_price(resource)?;
            line.apply_price(price, time_bound);
            return Ok(());
        }

        match self.reclaim_in(resource, line.quantity, window, reference) {
            Ok(()) => {
                let price = self.pricing.effective_price(resource)?;
                line.apply_price(price, time_bound);
            }
            Err(err) => {
                if !err.is_unavailability() {
                    warn!(line = %line.id, error = %err, "re-claim failed");
                }
                self.ledger.release_on(&[id], &reference)?;
                line.clear_price();
            }
        }
        Ok(())
    }

    fn reclaim_in(
        &self,
        resource: &Resource,
        quantity: i64,
        window: Option<Window>,
        reference: Reference,
    ) -> DomainResult<()> {
        let id = resource.id_typed();
        let mut tx = self.ctx.store.begin(&[id])?;
        StockLedger::<S>::release_in(&mut tx, id, &reference)?;
        self.ledger
            .record_in(&mut tx, resource, &Movement::claim(quantity, window, reference))?;
        tx.commit()
    }

    /// Convert a ready cart into a purchase.
    ///
    /// Every active claim held by the cart's lines is moved onto
    /// `Reference::purchase(purchase_id)` in one transaction over all affected
    /// resources; the cart is emptied afterwards. Nothing moves when a line no
    /// longer holds an active claim.
    pub fn checkout(&self, cart: &mut Cart, purchase_id: Uuid) -> DomainResult<CheckoutReceipt> {
        let evaluation = self.evaluator.evaluate_cart(cart)?;
        if !evaluation.ready {
            let pending = evaluation.lines.iter().filter(|l| !l.state.is_ready()).count();
            return Err(DomainError::validation(format!(
                "cart is not ready for checkout ({pending} line(s) not ready)"
            )));
        }

        let purchase = Reference::purchase(purchase_id);
        let references = cart.references();
        let owned = |e: &LedgerEntry| references.iter().any(|r| e.is_owned_by(r));
        let scope = self.ctx.store.resources_with_pending_claims(&owned)?;
        let now = self.ctx.clock.now();

        let mut tx = self.ctx.store.begin(&scope)?;
        let mut claims_moved = 0;
        let mut covered: HashSet<Reference> = HashSet::new();
        for id in &scope {
            let resource = self.resource(*id)?;
            let held: Vec<LedgerEntry> = tx
                .entries_for(*id)?
                .into_iter()
                .filter(|e| e.is_active_claim(now) && owned(e))
                .collect();
            tx.complete_claims(*id, &owned)?;
            for claim in held {
                covered.extend(references.iter().filter(|r| claim.is_owned_by(r)).copied());
                self.ledger.record_in(
                    &mut tx,
                    &resource,
                    &Movement::claim(claim.units(), claim.window(), purchase),
                )?;
                claims_moved += 1;
            }
        }
        // An expired claim reads as free stock, so a line past its window can
        // still look ready while holding nothing.
        if let Some(line) = cart.lines.iter().find(|l| !covered.contains(&l.reference())) {
            warn!(cart = %cart.id, line = %line.id, "checkout refused; line holds no active claim");
            return Err(DomainError::validation(format!(
                "line {} holds no active claim",
                line.id
            )));
        }
        tx.commit()?;

        let receipt = CheckoutReceipt {
            purchase,
            lines: cart.lines.len(),
            claims_moved,
            total: cart.subtotal(),
            currency: cart.lines.iter().find_map(|l| l.currency.clone()),
        };
        cart.lines.clear();
        info!(cart = %cart.id, %purchase, claims_moved, "cart checked out");
        Ok(receipt)
    }

    /// Housekeeping pass over expired claims.
    pub fn sweep_expired(&self) -> DomainResult<usize> {
        self.ledger.sweep_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reserva_core::CartId;
    use reserva_products::{PriceSource, PricingStrategy};
    use reserva_sales::LineState;

    use crate::test_support::Fixture;

    fn bounds(fx: &Fixture, from_h: i64, to_h: i64) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let w = fx.window(from_h, to_h);
        (Some(w.start()), Some(w.end()))
    }

    #[test]
    fn add_direct_line_claims_and_prices() -> anyhow::Result<()> {
        let fx = Fixture::new();
        let room = fx.booking("Room", 1, Some(10_000));
        let service = fx.service();
        let mut cart = Cart::new(CartId::new());
        let (from, until) = bounds(&fx, 0, 12);

        let ids = service.add_line(&mut cart, room.id_typed(), 1, from, until)?;
        assert_eq!(ids.len(), 1);
        let line = cart.line(ids[0]).unwrap();
        assert_eq!(line.line_price, Some(5_000));
        assert_eq!(line.line_subtotal, Some(5_000));
        assert!(service.evaluate_cart(&cart)?.ready);

        let check = service.check_availability(room.id_typed(), 1, from, until)?;
        assert!(!check.available);
        assert_eq!(check.max_quantity, 0);

        // A second cart cannot take the same room.
        let mut other = Cart::new(CartId::new());
        let err = service
            .add_line(&mut other, room.id_typed(), 1, from, until)
            .unwrap_err();
        assert!(err.is_unavailability());
        assert!(other.lines.is_empty());
        Ok(())
    }

    #[test]
    fn booking_without_window_is_added_unclaimed() -> anyhow::Result<()> {
        let fx = Fixture::new();
        let room = fx.booking("Room", 1, Some(10_000));
        let service = fx.service();
        let mut cart = Cart::new(CartId::new());

        let ids = service.add_line(&mut cart, room.id_typed(), 1, None, None)?;
        assert_eq!(
            service.evaluate_line(&cart, ids[0])?.state,
            LineState::NotReadyMissingWindow
        );
        assert_eq!(service.ledger().claimed_quantity(room.id_typed(), None)?, 0);

        let (from, until) = bounds(&fx, 0, 24);
        let change = service.change_window(&mut cart, from, until)?;
        assert!(change.evaluation.ready);
        assert_eq!(service.ledger().claimed_quantity(room.id_typed(), None)?, 1);
        Ok(())
    }

    #[test]
    fn pool_request_creates_one_line_per_unit() -> anyhow::Result<()> {
        let fx = Fixture::new();
        let a = fx.booking("A", 1, Some(20_000));
        let b = fx.booking("B", 1, Some(30_000));
        let pool = fx.pool("Rooms", PricingStrategy::Lowest, None, &[&a, &b]);
        let service = fx.service();
        let mut cart = Cart::new(CartId::new());
        let (from, until) = bounds(&fx, 0, 24);

        let ids = service.add_line(&mut cart, pool.id_typed(), 2, from, until)?;
        assert_eq!(ids.len(), 2);
        let singles: Vec<_> = cart.lines.iter().map(|l| l.allocated_single).collect();
        assert_eq!(singles, vec![Some(a.id_typed()), Some(b.id_typed())]);
        assert_eq!(cart.subtotal(), Some(50_000));
        assert!(matches!(
            cart.lines[0].selected_price,
            Some(PriceSource::Single { .. })
        ));
        Ok(())
    }

    #[test]
    fn remove_line_releases_its_claim() -> anyhow::Result<()> {
        let fx = Fixture::new();
        let room = fx.booking("Room", 1, Some(10_000));
        let service = fx.service();
        let mut cart = Cart::new(CartId::new());
        let (from, until) = bounds(&fx, 0, 24);
        let ids = service.add_line(&mut cart, room.id_typed(), 1, from, until)?;

        assert_eq!(service.remove_line(&mut cart, ids[0])?, 1);
        assert!(cart.lines.is_empty());
        assert!(service.check_availability(room.id_typed(), 1, from, until)?.available);
        assert_eq!(
            service.remove_line(&mut cart, ids[0]).unwrap_err(),
            DomainError::NotFound
        );
        Ok(())
    }

    #[test]
    fn invalid_window_change_leaves_lines_unavailable() -> anyhow::Result<()> {
        let fx = Fixture::new();
        let room = fx.booking("Room", 1, Some(10_000));
        let service = fx.service();
        let mut cart = Cart::new(CartId::new());
        let (from, until) = bounds(&fx, 0, 24);
        service.add_line(&mut cart, room.id_typed(), 1, from, until)?;

        let change = service.change_window(&mut cart, until, from)?;
        assert!(!change.evaluation.ready);
        assert_eq!(change.evaluation.lines[0].state, LineState::NotReadyInvalidWindow);
        assert_eq!(service.ledger().claimed_quantity(room.id_typed(), None)?, 0);
        Ok(())
    }

    #[test]
    fn quote_without_any_price_is_typed_error() {
        let fx = Fixture::new();
        let room = fx.booking("Room", 1, None);
        let err = fx.service().quote(room.id_typed(), None, None).unwrap_err();
        assert_eq!(err, DomainError::NoPriceResolvable(room.id_typed()));
    }

    #[test]
    fn quote_serializes_with_tagged_source() -> anyhow::Result<()> {
        let fx = Fixture::new();
        let room = fx.booking("Room", 1, Some(20));
        let pool = fx.pool("Rooms", PricingStrategy::Average, None, &[&room]);
        let quote = fx.service().quote(pool.id_typed(), None, None)?;

        let json = serde_json::to_value(&quote)?;
        assert_eq!(json["unit_amount"], 20);
        assert_eq!(json["currency"], "USD");
        assert_eq!(json["source"]["source"], "pool_aggregate");
        assert_eq!(json["source"]["strategy"], "average");
        Ok(())
    }

    #[test]
    fn checkout_requires_ready_cart_and_moves_claims() -> anyhow::Result<()> {
        let fx = Fixture::new();
        let room = fx.booking("Room", 1, Some(10_000));
        let service = fx.service();
        let mut cart = Cart::new(CartId::new());

        service.add_line(&mut cart, room.id_typed(), 1, None, None)?;
        assert!(matches!(
            service.checkout(&mut cart, Uuid::now_v7()),
            Err(DomainError::Validation(_))
        ));

        let (from, until) = bounds(&fx, 0, 24);
        service.change_window(&mut cart, from, until)?;
        let line_ref = cart.lines[0].reference();
        let purchase_id = Uuid::now_v7();
        let receipt = service.checkout(&mut cart, purchase_id)?;

        assert_eq!(receipt.claims_moved, 1);
        assert_eq!(receipt.total, Some(10_000));
        assert_eq!(receipt.currency.as_deref(), Some("USD"));
        assert!(cart.lines.is_empty());
        // The room stays held, now by the purchase.
        assert_eq!(service.release(&line_ref)?, 0);
        assert!(!service.check_availability(room.id_typed(), 1, from, until)?.available);
        assert_eq!(service.release(&Reference::purchase(purchase_id))?, 1);
        Ok(())
    }

    #[test]
    fn checkout_refuses_a_line_whose_claim_expired() -> anyhow::Result<()> {
        let fx = Fixture::new();
        let room = fx.booking("Room", 1, Some(10_000));
        let service = fx.service();
        let mut cart = Cart::new(CartId::new());
        let (from, until) = bounds(&fx, 0, 24);
        service.add_line(&mut cart, room.id_typed(), 1, from, until)?;

        fx.clock.advance(chrono::Duration::hours(25));
        assert!(service.evaluate_cart(&cart)?.ready);
        assert!(matches!(
            service.checkout(&mut cart, Uuid::now_v7()),
            Err(DomainError::Validation(_))
        ));
        assert_eq!(cart.lines.len(), 1);
        Ok(())
    }
}
