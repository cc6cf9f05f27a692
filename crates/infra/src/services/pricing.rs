use serde::{Deserialize, Serialize};

use reserva_core::{DomainResult, Window};
use reserva_inventory::capacity;
use reserva_products::{
    PriceSource, Resource, ResourceKind, ResolvedPrice, booking_line_price, price_aggregate,
    resolve_default_price,
};

use crate::catalog::Catalog;
use crate::ledger_store::{LedgerRead, LedgerStore};

use super::{AvailabilityEngine, EngineContext};

/// A price quote for a resource and optional window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub unit_amount: i64,
    pub line_price: i64,
    pub currency: String,
    pub source: PriceSource,
}

/// Resolves unit prices for singles and pools, and prorates bookings.
///
/// Precedence is fixed: once a single is allocated, the single's own price is
/// charged; the pool's price (own, or strategy aggregate) is only a fallback.
/// Strategy never compares a pool price against a single's price.
pub struct PricingResolver<S, C> {
    ctx: EngineContext<S, C>,
    availability: AvailabilityEngine<S>,
}

impl<S, C> Clone for PricingResolver<S, C> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            availability: self.availability.clone(),
        }
    }
}

impl<S: LedgerStore, C: Catalog> PricingResolver<S, C> {
    pub fn new(ctx: EngineContext<S, C>) -> Self {
        let availability = AvailabilityEngine::new(ctx.store.clone(), ctx.clock.clone());
        Self { ctx, availability }
    }

    /// The resource's own default price, honouring a running sale.
    pub fn effective_price(&self, resource: &Resource) -> DomainResult<Option<ResolvedPrice>> {
        self.own_price(resource, true)
    }

    /// The resource's own default price, ignoring sales.
    pub fn regular_price(&self, resource: &Resource) -> DomainResult<Option<ResolvedPrice>> {
        self.own_price(resource, false)
    }

    fn own_price(&self, resource: &Resource, sale_aware: bool) -> DomainResult<Option<ResolvedPrice>> {
        let id = resource.id_typed();
        let prices = self.ctx.catalog.prices(id)?;
        let Some(price) = resolve_default_price(id, &prices, &self.ctx.config.currency)? else {
            return Ok(None);
        };
        let amount = if sale_aware {
            price.current_amount(self.ctx.clock.now())
        } else {
            price.amount
        };
        Ok(Some(ResolvedPrice {
            amount,
            currency: price.currency.clone(),
            source: PriceSource::Own { price: price.id },
        }))
    }

    /// Quoted pool price for `window`.
    pub fn pool_price(&self, pool: &Resource, window: Option<&Window>) -> DomainResult<Option<ResolvedPrice>> {
        self.pool_price_in(self.ctx.store.as_ref(), pool, window)
    }

    /// Quoted pool price as seen by `view`.
    ///
    /// The pool's own price short-circuits the strategy. Otherwise the strategy
    /// aggregates the prices of singles available for `window` (or with any
    /// capacity, without a window); a fully booked single never counts.
    pub fn pool_price_in<R: LedgerRead + ?Sized>(
        &self,
        view: &R,
        pool: &Resource,
        window: Option<&Window>,
    ) -> DomainResult<Option<ResolvedPrice>> {
        if let Some(own) = self.effective_price(pool)? {
            return Ok(Some(own));
        }

        let mut amounts = Vec::new();
        for member_id in self.ctx.catalog.members(pool.id_typed())? {
            let member = self.ctx.catalog.resource(member_id)?;
            if !member.is_single() {
                continue;
            }
            let in_stock = match window {
                Some(_) => self.availability.available_in(view, &member, window, &[])? > 0,
                None if member.tracks_stock() => capacity(&view.entries_for(member_id)?) > 0,
                None => true,
            };
            if !in_stock {
                continue;
            }
            if let Some(price) = self.effective_price(&member)? {
                amounts.push(price.amount);
            }
        }

        let strategy = pool.pricing_strategy();
        Ok(price_aggregate(strategy, &amounts).map(|amount| ResolvedPrice {
            amount,
            currency: self.ctx.config.currency.clone(),
            source: PriceSource::PoolAggregate { strategy },
        }))
    }

    /// Price for any resource: pools go through `pool_price`.
    pub fn resource_price(&self, resource: &Resource, window: Option<&Window>) -> DomainResult<Option<ResolvedPrice>> {
        if resource.is_pool() {
            self.pool_price(resource, window)
        } else {
            self.effective_price(resource)
        }
    }

    /// Unit price for a cart line on `resource`.
    ///
    /// The allocated single's own price wins; otherwise fall back to the
    /// resource's own or pool price.
    pub fn line_unit_amount(
        &self,
        resource: &Resource,
        allocated: Option<&Resource>,
        window: Option<&Window>,
    ) -> DomainResult<Option<ResolvedPrice>> {
        self.line_unit_amount_in(self.ctx.store.as_ref(), resource, allocated, window)
    }

    pub fn line_unit_amount_in<R: LedgerRead + ?Sized>(
        &self,
        view: &R,
        resource: &Resource,
        allocated: Option<&Resource>,
        window: Option<&Window>,
    ) -> DomainResult<Option<ResolvedPrice>> {
        if let Some(single) = allocated {
            if let Some(price) = self.effective_price(single)? {
                let source = match price.source {
                    PriceSource::Own { price } => PriceSource::Single {
                        resource: single.id_typed(),
                        price,
                    },
                    other => other,
                };
                return Ok(Some(ResolvedPrice { source, ..price }));
            }
        }
        if resource.is_pool() {
            self.pool_price_in(view, resource, window)
        } else {
            self.effective_price(resource)
        }
    }

    /// Whether lines on this resource are priced per day over a window:
    /// bookings, and pools backed by at least one booking.
    pub fn is_time_bound(&self, resource: &Resource) -> DomainResult<bool> {
        match resource.kind() {
            ResourceKind::Booking => Ok(true),
            ResourceKind::Simple => Ok(false),
            ResourceKind::Pool => {
                for member in self.ctx.catalog.members(resource.id_typed())? {
                    if self.ctx.catalog.resource(member)?.requires_window() {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    /// Unit price, line price and currency for `resource` over `window`.
    ///
    /// `None` when nothing is resolvable.
    pub fn quote(&self, resource: &Resource, window: Option<&Window>) -> DomainResult<Option<Quote>> {
        let Some(unit) = self.resource_price(resource, window)? else {
            return Ok(None);
        };
        let line_price = match window {
            Some(w) if self.is_time_bound(resource)? => booking_line_price(unit.amount, w),
            _ => unit.amount,
        };
        Ok(Some(Quote {
            unit_amount: unit.amount,
            line_price,
            currency: unit.currency,
            source: unit.source,
        }))
    }
}
