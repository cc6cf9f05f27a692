use serde::{Deserialize, Serialize};

use reserva_core::{DomainError, DomainResult, Entity, ResourceId};

use crate::strategy::PricingStrategy;

/// What kind of thing a resource is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Plain stock item, sold without a time window.
    Simple,
    /// Time-bound item (room, car, desk); every claim needs a window.
    Booking,
    /// Virtual resource backed by one or more singles.
    Pool,
}

/// A reservable entity.
///
/// POOL resources never carry their own ledger entries; their capacity is the
/// union of their members' capacities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    id: ResourceId,
    name: String,
    kind: ResourceKind,
    tracks_stock: bool,
    allow_backorders: bool,
    pricing_strategy: PricingStrategy,
}

impl Resource {
    pub fn new(id: ResourceId, name: impl Into<String>, kind: ResourceKind) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        Ok(Self {
            id,
            name,
            kind,
            tracks_stock: true,
            allow_backorders: false,
            pricing_strategy: PricingStrategy::default(),
        })
    }

    pub fn simple(id: ResourceId, name: impl Into<String>) -> DomainResult<Self> {
        Self::new(id, name, ResourceKind::Simple)
    }

    pub fn booking(id: ResourceId, name: impl Into<String>) -> DomainResult<Self> {
        Self::new(id, name, ResourceKind::Booking)
    }

    pub fn pool(
        id: ResourceId,
        name: impl Into<String>,
        strategy: PricingStrategy,
    ) -> DomainResult<Self> {
        let mut pool = Self::new(id, name, ResourceKind::Pool)?;
        pool.pricing_strategy = strategy;
        Ok(pool)
    }

    /// Stop tracking stock: the resource is always available.
    pub fn untracked(mut self) -> Self {
        self.tracks_stock = false;
        self
    }

    /// Allow permanent stock to go negative.
    pub fn with_backorders(mut self) -> Self {
        self.allow_backorders = true;
        self
    }

    pub fn id_typed(&self) -> ResourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn tracks_stock(&self) -> bool {
        self.tracks_stock
    }

    pub fn allows_backorders(&self) -> bool {
        self.allow_backorders
    }

    /// Only meaningful for pools.
    pub fn pricing_strategy(&self) -> PricingStrategy {
        self.pricing_strategy
    }

    pub fn is_pool(&self) -> bool {
        self.kind == ResourceKind::Pool
    }

    /// A single is anything a pool can be backed by.
    pub fn is_single(&self) -> bool {
        matches!(self.kind, ResourceKind::Simple | ResourceKind::Booking)
    }

    pub fn requires_window(&self) -> bool {
        self.kind == ResourceKind::Booking
    }
}

impl Entity for Resource {
    type Id = ResourceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
