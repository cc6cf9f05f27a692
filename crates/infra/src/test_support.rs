//! Shared fixture for service tests: in-memory adapters and a manual clock.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use reserva_core::{Clock, ManualClock, ResourceId, Window};
use reserva_inventory::Movement;
use reserva_products::{Price, PricingStrategy, Resource};

use crate::catalog::InMemoryCatalog;
use crate::config::ReservationConfig;
use crate::ledger_store::InMemoryLedgerStore;
use crate::reservations::ReservationService;
use crate::services::{
    AvailabilityEngine, EngineContext, LineEvaluator, PoolAllocator, PricingResolver, StockLedger,
};

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap()
}

pub struct Fixture {
    pub store: Arc<InMemoryLedgerStore>,
    pub catalog: Arc<InMemoryCatalog>,
    pub clock: Arc<ManualClock>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryLedgerStore::new()),
            catalog: Arc::new(InMemoryCatalog::new()),
            clock: Arc::new(ManualClock::new(start())),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// `[start + from_h, start + to_h)`, in hours from the fixed start time.
    pub fn window(&self, from_h: i64, to_h: i64) -> Window {
        Window::new(start() + Duration::hours(from_h), start() + Duration::hours(to_h)).unwrap()
    }

    pub fn register(&self, resource: Resource) -> Resource {
        self.catalog.upsert_resource(resource.clone()).unwrap();
        resource
    }

    /// Default price in the configured currency.
    pub fn price(&self, resource: &Resource, amount: i64) {
        self.catalog
            .add_price(Price::new(resource.id_typed(), amount, "USD").unwrap().as_default())
            .unwrap();
    }

    fn stocked(&self, resource: Resource, capacity: i64, price: Option<i64>) -> Resource {
        let resource = self.register(resource);
        if capacity > 0 {
            self.ledger()
                .record_movement(&resource, Movement::increase(capacity))
                .unwrap();
        }
        if let Some(amount) = price {
            self.price(&resource, amount);
        }
        resource
    }

    pub fn booking(&self, name: &str, capacity: i64, price: Option<i64>) -> Resource {
        self.stocked(Resource::booking(ResourceId::new(), name).unwrap(), capacity, price)
    }

    pub fn simple(&self, name: &str, capacity: i64, price: Option<i64>) -> Resource {
        self.stocked(Resource::simple(ResourceId::new(), name).unwrap(), capacity, price)
    }

    pub fn pool(
        &self,
        name: &str,
        strategy: PricingStrategy,
        own_price: Option<i64>,
        members: &[&Resource],
    ) -> Resource {
        let pool = self.register(Resource::pool(ResourceId::new(), name, strategy).unwrap());
        for member in members {
            self.catalog.attach(pool.id_typed(), member.id_typed()).unwrap();
        }
        if let Some(amount) = own_price {
            self.price(&pool, amount);
        }
        pool
    }

    pub fn ctx(&self) -> EngineContext<InMemoryLedgerStore, InMemoryCatalog> {
        EngineContext::new(
            Arc::clone(&self.store),
            Arc::clone(&self.catalog),
            self.dyn_clock(),
            ReservationConfig::default(),
        )
    }

    fn dyn_clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn ledger(&self) -> StockLedger<InMemoryLedgerStore> {
        StockLedger::new(Arc::clone(&self.store), self.dyn_clock())
    }

    pub fn availability(&self) -> AvailabilityEngine<InMemoryLedgerStore> {
        AvailabilityEngine::new(Arc::clone(&self.store), self.dyn_clock())
    }

    pub fn pricing(&self) -> PricingResolver<InMemoryLedgerStore, InMemoryCatalog> {
        PricingResolver::new(self.ctx())
    }

    pub fn allocator(&self) -> PoolAllocator<InMemoryLedgerStore, InMemoryCatalog> {
        PoolAllocator::new(self.ctx())
    }

    pub fn evaluator(&self) -> LineEvaluator<InMemoryLedgerStore, InMemoryCatalog> {
        LineEvaluator::new(self.ctx())
    }

    pub fn service(&self) -> ReservationService<InMemoryLedgerStore, InMemoryCatalog> {
        ReservationService::from_context(self.ctx())
    }
}
