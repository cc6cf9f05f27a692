use std::collections::HashMap;

use reserva_core::{DomainError, DomainResult, LineId, ResourceId, windows_overlap};
use reserva_products::Resource;
use reserva_sales::{Cart, CartEvaluation, LineEvaluation, ReadinessInput, assess};

use crate::catalog::Catalog;
use crate::ledger_store::LedgerStore;

use super::{AvailabilityEngine, EngineContext, PricingResolver};

/// Derives readiness for cart lines. Read-only: never touches the ledger.
///
/// A line's remaining capacity is the target's availability with every claim
/// held by this cart excluded, minus the units wanted by earlier lines on the
/// same target whose windows overlap.
pub struct LineEvaluator<S, C> {
    ctx: EngineContext<S, C>,
    availability: AvailabilityEngine<S>,
    pricing: PricingResolver<S, C>,
}

impl<S, C> Clone for LineEvaluator<S, C> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            availability: self.availability.clone(),
            pricing: self.pricing.clone(),
        }
    }
}

impl<S: LedgerStore, C: Catalog> LineEvaluator<S, C> {
    pub fn new(ctx: EngineContext<S, C>) -> Self {
        Self {
            availability: AvailabilityEngine::new(ctx.store.clone(), ctx.clock.clone()),
            pricing: PricingResolver::new(ctx.clone()),
            ctx,
        }
    }

    pub fn evaluate_cart(&self, cart: &Cart) -> DomainResult<CartEvaluation> {
        Ok(CartEvaluation::from_lines(self.evaluate_prefix(cart, cart.lines.len())?))
    }

    pub fn evaluate_line(&self, cart: &Cart, line: LineId) -> DomainResult<LineEvaluation> {
        let idx = cart
            .lines
            .iter()
            .position(|l| l.id == line)
            .ok_or_else(DomainError::not_found)?;
        self.evaluate_prefix(cart, idx + 1)?
            .pop()
            .ok_or_else(DomainError::not_found)
    }

    pub fn is_ready(&self, cart: &Cart, line: LineId) -> DomainResult<bool> {
        Ok(self.evaluate_line(cart, line)?.state.is_ready())
    }

    /// Evaluate the first `len` lines in cart order.
    fn evaluate_prefix(&self, cart: &Cart, len: usize) -> DomainResult<Vec<LineEvaluation>> {
        let mut resources = ResourceCache::default();
        let mut evaluated = Vec::with_capacity(len);
        for idx in 0..len {
            let evaluation = self.evaluate_at(cart, idx, &evaluated, &mut resources)?;
            evaluated.push(evaluation);
        }
        Ok(evaluated)
    }

    /// Siblings count against a line only when they are themselves ready.
    fn evaluate_at(
        &self,
        cart: &Cart,
        idx: usize,
        earlier: &[LineEvaluation],
        resources: &mut ResourceCache,
    ) -> DomainResult<LineEvaluation> {
        let line = &cart.lines[idx];
        let resource = resources.get(self.ctx.catalog.as_ref(), line.resource)?;
        let is_pool = resource.is_pool();
        let requires_window = if is_pool {
            self.pricing.is_time_bound(&resource)?
        } else {
            resource.requires_window()
        };

        let window = line.window();
        let remaining = match line.stock_target(is_pool) {
            None => 0,
            Some(target) => {
                let target_resource = resources.get(self.ctx.catalog.as_ref(), target)?;
                let free = self.availability.available_in(
                    self.ctx.store.as_ref(),
                    &target_resource,
                    window.as_ref(),
                    &cart.references(),
                )?;
                let mut wanted_before: i64 = 0;
                for (sibling, evaluation) in cart.lines[..idx].iter().zip(earlier) {
                    if !evaluation.state.is_ready() {
                        continue;
                    }
                    let sibling_is_pool = resources.get(self.ctx.catalog.as_ref(), sibling.resource)?.is_pool();
                    if sibling.stock_target(sibling_is_pool) == Some(target)
                        && windows_overlap(sibling.window().as_ref(), window.as_ref())
                    {
                        wanted_before = wanted_before.saturating_add(sibling.quantity);
                    }
                }
                free.saturating_sub(wanted_before)
            }
        };

        let state = assess(
            line,
            &ReadinessInput {
                requires_window,
                is_pool,
                remaining,
            },
        );
        Ok(LineEvaluation::of(line, state))
    }
}

#[derive(Default)]
struct ResourceCache(HashMap<ResourceId, Resource>);

impl ResourceCache {
    fn get<C: Catalog + ?Sized>(&mut self, catalog: &C, id: ResourceId) -> DomainResult<Resource> {
        if let Some(found) = self.0.get(&id) {
            return Ok(found.clone());
        }
        let resource = catalog.resource(id)?;
        self.0.insert(id, resource.clone());
        Ok(resource)
    }
}
