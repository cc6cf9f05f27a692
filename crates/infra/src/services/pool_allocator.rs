use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use reserva_core::{DomainError, DomainResult, LineId, Reference, ResourceId, Window};
use reserva_inventory::{Movement, capacity};
use reserva_products::{ResolvedPrice, Resource, selection_order};
use reserva_sales::ReservationLine;

use crate::catalog::Catalog;
use crate::ledger_store::{LedgerRead, LedgerStore, LedgerTransaction};

use super::{AvailabilityEngine, EngineContext, PricingResolver, StockLedger};

/// Units claimed from one single on behalf of a pool request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub resource: ResourceId,
    pub quantity: i64,
}

/// Outcome of a reallocation pass, by line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReallocationReport {
    /// Lines that kept their single and were only repriced.
    pub kept: Vec<LineId>,
    /// Lines now backed by a different single (or newly backed).
    pub moved: Vec<LineId>,
    /// Lines left without a single.
    pub unavailable: Vec<LineId>,
}

impl ReallocationReport {
    pub fn is_fully_allocated(&self) -> bool {
        self.unavailable.is_empty()
    }
}

/// Picks which singles back a pool request, claims them, and moves lines to
/// new windows.
///
/// Every operation runs in one ledger transaction scoped to all of the
/// pool's members, so either every unit is claimed or none is.
pub struct PoolAllocator<S, C> {
    ctx: EngineContext<S, C>,
    ledger: StockLedger<S>,
    availability: AvailabilityEngine<S>,
    pricing: PricingResolver<S, C>,
}

impl<S, C> Clone for PoolAllocator<S, C> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            ledger: self.ledger.clone(),
            availability: self.availability.clone(),
            pricing: self.pricing.clone(),
        }
    }
}

impl<S: LedgerStore, C: Catalog> PoolAllocator<S, C> {
    pub fn new(ctx: EngineContext<S, C>) -> Self {
        Self {
            ledger: StockLedger::new(ctx.store.clone(), ctx.clock.clone()),
            availability: AvailabilityEngine::new(ctx.store.clone(), ctx.clock.clone()),
            pricing: PricingResolver::new(ctx.clone()),
            ctx,
        }
    }

    /// Sum of what every eligible single has free for `window`.
    pub fn max_available_quantity(&self, pool: &Resource, window: Option<&Window>) -> DomainResult<i64> {
        ensure_pool(pool)?;
        let members = self.members(pool)?;
        let view = self.ctx.store.as_ref();
        let mut total: i64 = 0;
        for member in self.eligible(view, &members)? {
            let free = self.availability.available_in(view, member, window, &[])?;
            total = total.saturating_add(free.max(0));
        }
        Ok(total)
    }

    /// Claim `quantity` units from the pool's singles in allocation order.
    ///
    /// A single with more than one free unit may supply several. Fails with
    /// `NotEnoughAvailable` without claiming anything when the pool cannot
    /// cover the whole request.
    pub fn claim(
        &self,
        pool: &Resource,
        quantity: i64,
        window: Option<&Window>,
        reference: Reference,
    ) -> DomainResult<Vec<Allocation>> {
        ensure_pool(pool)?;
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        let members = self.members(pool)?;
        if members.is_empty() {
            return Err(DomainError::PoolHasNoMembers(pool.id_typed()));
        }
        require_window(pool, &members, window)?;

        let scope: Vec<ResourceId> = members.iter().map(Resource::id_typed).collect();
        let mut tx = self.ctx.store.begin(&scope)?;
        let candidates = self.ordered_candidates(&tx, pool, &members, window)?;
        let free: i64 = candidates.iter().map(|(_, free)| *free).sum();
        if free < quantity {
            debug!(pool = %pool.id_typed(), requested = quantity, available = free, "pool claim refused");
            return Err(DomainError::NotEnoughAvailable {
                requested: quantity,
                available: free,
            });
        }

        let mut remaining = quantity;
        let mut allocations = Vec::new();
        for (idx, free) in candidates {
            if remaining == 0 {
                break;
            }
            let take = free.min(remaining);
            let single = &members[idx];
            self.ledger
                .record_in(&mut tx, single, &Movement::claim(take, window.copied(), reference))?;
            allocations.push(Allocation {
                resource: single.id_typed(),
                quantity: take,
            });
            remaining -= take;
        }
        tx.commit()?;

        info!(
            pool = %pool.id_typed(),
            %reference,
            quantity,
            singles = allocations.len(),
            "pool claim committed"
        );
        Ok(allocations)
    }

    /// Back each line with one single, claimed under the line's own reference.
    ///
    /// All lines are allocated and priced, or none are.
    pub fn allocate_lines(
        &self,
        pool: &Resource,
        lines: &mut [ReservationLine],
        window: Option<&Window>,
    ) -> DomainResult<()> {
        ensure_pool(pool)?;
        let members = self.members(pool)?;
        if members.is_empty() {
            return Err(DomainError::PoolHasNoMembers(pool.id_typed()));
        }
        require_window(pool, &members, window)?;
        let time_bound = self.pricing.is_time_bound(pool)?;

        let scope: Vec<ResourceId> = members.iter().map(Resource::id_typed).collect();
        let mut tx = self.ctx.store.begin(&scope)?;
        let requested: i64 = lines.iter().map(|l| l.quantity).sum();
        let free: i64 = self
            .ordered_candidates(&tx, pool, &members, window)?
            .iter()
            .map(|(_, free)| *free)
            .sum();
        if free < requested {
            return Err(DomainError::NotEnoughAvailable {
                requested,
                available: free,
            });
        }

        let mut staged = Vec::with_capacity(lines.len());
        for line in lines.iter() {
            let candidates = self.ordered_candidates(&tx, pool, &members, window)?;
            let Some(&(idx, _)) = candidates.iter().find(|(_, free)| *free >= line.quantity) else {
                return Err(DomainError::NotEnoughAvailable {
                    requested,
                    available: free,
                });
            };
            let single = &members[idx];
            self.ledger.record_in(
                &mut tx,
                single,
                &Movement::claim(line.quantity, window.copied(), line.reference()),
            )?;
            let price = self
                .pricing
                .line_unit_amount_in(&tx, pool, Some(single), window)?;
            staged.push((single.id_typed(), price));
        }
        tx.commit()?;

        for (line, (single, price)) in lines.iter_mut().zip(staged) {
            line.set_window(window.copied());
            line.allocated_single = Some(single);
            line.apply_price(price, time_bound);
        }
        info!(pool = %pool.id_typed(), lines = lines.len(), "pool lines allocated");
        Ok(())
    }

    /// Release `reference`'s claims on any of the pool's singles.
    pub fn release(&self, pool: &Resource, reference: &Reference) -> DomainResult<usize> {
        ensure_pool(pool)?;
        let scope: Vec<ResourceId> = self.members(pool)?.iter().map(Resource::id_typed).collect();
        self.ledger.release_on(&scope, reference)
    }

    /// Move pool-backed lines to `new_window`.
    ///
    /// Each line keeps its single when that single is still free for the new
    /// window (its own claims excluded), otherwise takes the next free single
    /// in allocation order that no other line of the batch holds, otherwise
    /// becomes unavailable. Every line keeping its single is settled before
    /// any line looks for a replacement. Never fails: problems leave lines
    /// unavailable and are logged.
    pub fn reallocate(
        &self,
        pool: &Resource,
        lines: &mut [ReservationLine],
        new_window: Option<&Window>,
    ) -> ReallocationReport {
        match self.try_reallocate(pool, lines, new_window) {
            Ok(report) => report,
            Err(err) => {
                warn!(pool = %pool.id_typed(), error = %err, "reallocation failed; lines left unavailable");
                let mut report = ReallocationReport::default();
                for line in lines.iter_mut() {
                    line.set_window(new_window.copied());
                    line.mark_unavailable();
                    report.unavailable.push(line.id);
                }
                report
            }
        }
    }

    fn try_reallocate(
        &self,
        pool: &Resource,
        lines: &mut [ReservationLine],
        new_window: Option<&Window>,
    ) -> DomainResult<ReallocationReport> {
        ensure_pool(pool)?;
        let members = self.members(pool)?;
        let time_bound = self.pricing.is_time_bound(pool)?;
        let window_ok = require_window(pool, &members, new_window).is_ok();

        let mut scope: Vec<ResourceId> = members.iter().map(Resource::id_typed).collect();
        scope.extend(lines.iter().filter_map(|l| l.allocated_single));
        let mut tx = self.ctx.store.begin(&scope)?;

        let mut outcomes: Vec<Option<(ResourceId, Option<ResolvedPrice>)>> = vec![None; lines.len()];
        for line in lines.iter() {
            let reference = line.reference();
            for resource in &scope {
                StockLedger::<S>::release_in(&mut tx, *resource, &reference)?;
            }
        }
        if !window_ok || members.is_empty() {
            tx.commit()?;
            return Ok(self.finish_reallocation(pool, lines, outcomes, new_window, time_bound));
        }

        // Lines whose single is still free keep it before anyone else picks.
        for (pos, line) in lines.iter().enumerate() {
            let Some(idx) = line
                .allocated_single
                .and_then(|id| members.iter().position(|m| m.id_typed() == id))
            else {
                continue;
            };
            let member = &members[idx];
            if !member.tracks_stock()
                || self.availability.available_in(&tx, member, new_window, &[])? < line.quantity
            {
                continue;
            }
            outcomes[pos] = self.claim_for_line(&mut tx, pool, member, line, new_window)?;
        }

        // The rest take the next free single no other line of the batch holds.
        for (pos, line) in lines.iter().enumerate() {
            if outcomes[pos].is_some() {
                continue;
            }
            let taken: Vec<ResourceId> = outcomes.iter().flatten().map(|(single, _)| *single).collect();
            let chosen = self
                .ordered_candidates(&tx, pool, &members, new_window)?
                .into_iter()
                .find(|(idx, free)| *free >= line.quantity && !taken.contains(&members[*idx].id_typed()))
                .map(|(idx, _)| idx);
            if let Some(idx) = chosen {
                outcomes[pos] = self.claim_for_line(&mut tx, pool, &members[idx], line, new_window)?;
            }
        }
        tx.commit()?;
        Ok(self.finish_reallocation(pool, lines, outcomes, new_window, time_bound))
    }

    /// Stage a claim for `line` on `single`. A refused claim leaves the line
    /// without a single instead of failing the batch.
    fn claim_for_line<T: LedgerTransaction>(
        &self,
        tx: &mut T,
        pool: &Resource,
        single: &Resource,
        line: &ReservationLine,
        window: Option<&Window>,
    ) -> DomainResult<Option<(ResourceId, Option<ResolvedPrice>)>> {
        let claimed = self.ledger.record_in(
            tx,
            single,
            &Movement::claim(line.quantity, window.copied(), line.reference()),
        );
        match claimed {
            Ok(_) => {
                let price = self.pricing.line_unit_amount_in(&*tx, pool, Some(single), window)?;
                Ok(Some((single.id_typed(), price)))
            }
            Err(err) => {
                warn!(line = %line.id, single = %single.id_typed(), error = %err, "reallocation claim failed");
                Ok(None)
            }
        }
    }

    fn finish_reallocation(
        &self,
        pool: &Resource,
        lines: &mut [ReservationLine],
        outcomes: Vec<Option<(ResourceId, Option<ResolvedPrice>)>>,
        new_window: Option<&Window>,
        time_bound: bool,
    ) -> ReallocationReport {
        let mut report = ReallocationReport::default();
        for (line, outcome) in lines.iter_mut().zip(outcomes) {
            line.set_window(new_window.copied());
            match outcome {
                Some((single, price)) => {
                    if line.allocated_single == Some(single) {
                        report.kept.push(line.id);
                    } else {
                        report.moved.push(line.id);
                    }
                    line.allocated_single = Some(single);
                    line.apply_price(price, time_bound);
                }
                None => {
                    line.mark_unavailable();
                    report.unavailable.push(line.id);
                }
            }
        }

        debug!(
            pool = %pool.id_typed(),
            kept = report.kept.len(),
            moved = report.moved.len(),
            unavailable = report.unavailable.len(),
            "pool lines reallocated"
        );
        report
    }

    /// The pool's singles in declaration order.
    pub fn members(&self, pool: &Resource) -> DomainResult<Vec<Resource>> {
        let mut members = Vec::new();
        for id in self.ctx.catalog.members(pool.id_typed())? {
            let member = self.ctx.catalog.resource(id)?;
            if member.is_single() {
                members.push(member);
            }
        }
        Ok(members)
    }

    /// Singles that can back a claim: tracked stock with positive capacity.
    fn eligible<'m, R: LedgerRead + ?Sized>(
        &self,
        view: &R,
        members: &'m [Resource],
    ) -> DomainResult<Vec<&'m Resource>> {
        let mut eligible = Vec::new();
        for member in members {
            if member.tracks_stock() && capacity(&view.entries_for(member.id_typed())?) > 0 {
                eligible.push(member);
            }
        }
        Ok(eligible)
    }

    /// Indices into `members` in allocation order, with their free units.
    /// Singles with nothing free are skipped.
    fn ordered_candidates<R: LedgerRead + ?Sized>(
        &self,
        view: &R,
        pool: &Resource,
        members: &[Resource],
        window: Option<&Window>,
    ) -> DomainResult<Vec<(usize, i64)>> {
        let mut priced = Vec::with_capacity(members.len());
        for (idx, member) in members.iter().enumerate() {
            if !member.tracks_stock() || capacity(&view.entries_for(member.id_typed())?) <= 0 {
                continue;
            }
            let amount = self.pricing.effective_price(member)?.map(|p| p.amount);
            priced.push((idx, amount));
        }

        let mut candidates = Vec::new();
        for idx in selection_order(pool.pricing_strategy(), &priced) {
            let free = self
                .availability
                .available_in(view, &members[idx], window, &[])?;
            if free > 0 {
                candidates.push((idx, free));
            }
        }
        Ok(candidates)
    }
}

fn ensure_pool(resource: &Resource) -> DomainResult<()> {
    if !resource.is_pool() {
        return Err(DomainError::validation(format!(
            "resource {} is not a pool",
            resource.id_typed()
        )));
    }
    Ok(())
}

fn require_window(pool: &Resource, members: &[Resource], window: Option<&Window>) -> DomainResult<()> {
    if window.is_none() && members.iter().any(Resource::requires_window) {
        return Err(DomainError::MissingWindow(pool.id_typed()));
    }
    Ok(())
}
