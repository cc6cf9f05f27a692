use std::collections::HashMap;
use std::sync::RwLock;

use reserva_core::{DomainError, DomainResult, ResourceId};
use reserva_products::{PoolMembership, Price, Resource};

use super::r#trait::Catalog;

/// In-memory catalog for tests/dev.
///
/// Memberships are kept in insertion order, which is the pools' declaration
/// order used to break allocation ties.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    resources: RwLock<HashMap<ResourceId, Resource>>,
    memberships: RwLock<Vec<PoolMembership>>,
    prices: RwLock<Vec<Price>>,
}

fn poisoned() -> DomainError {
    DomainError::conflict("catalog lock poisoned")
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a resource.
    pub fn upsert_resource(&self, resource: Resource) -> DomainResult<()> {
        let mut resources = self.resources.write().map_err(|_| poisoned())?;
        resources.insert(resource.id_typed(), resource);
        Ok(())
    }

    /// Attach `single` to `pool`.
    pub fn attach(&self, pool: ResourceId, single: ResourceId) -> DomainResult<PoolMembership> {
        let link = PoolMembership::link(&self.resource(pool)?, &self.resource(single)?)?;
        let mut memberships = self.memberships.write().map_err(|_| poisoned())?;
        if memberships.contains(&link) {
            return Err(DomainError::conflict("single is already a member of this pool"));
        }
        memberships.push(link);
        Ok(link)
    }

    /// Remove a membership; returns whether one existed.
    pub fn detach(&self, pool: ResourceId, single: ResourceId) -> DomainResult<bool> {
        let mut memberships = self.memberships.write().map_err(|_| poisoned())?;
        let before = memberships.len();
        memberships.retain(|m| !(m.pool == pool && m.single == single));
        Ok(memberships.len() != before)
    }

    /// Add a price. At most one default per resource per currency.
    pub fn add_price(&self, price: Price) -> DomainResult<()> {
        self.resource(price.resource)?;
        let mut prices = self.prices.write().map_err(|_| poisoned())?;
        if price.is_default
            && prices.iter().any(|p| {
                p.resource == price.resource
                    && p.is_default
                    && p.currency.eq_ignore_ascii_case(&price.currency)
            })
        {
            return Err(DomainError::AmbiguousDefaultPrice(price.resource));
        }
        prices.push(price);
        Ok(())
    }
}

impl Catalog for InMemoryCatalog {
    fn resource(&self, id: ResourceId) -> DomainResult<Resource> {
        let resources = self.resources.read().map_err(|_| poisoned())?;
        resources.get(&id).cloned().ok_or_else(DomainError::not_found)
    }

    fn members(&self, pool: ResourceId) -> DomainResult<Vec<ResourceId>> {
        let memberships = self.memberships.read().map_err(|_| poisoned())?;
        Ok(memberships
            .iter()
            .filter(|m| m.pool == pool)
            .map(|m| m.single)
            .collect())
    }

    fn pools_of(&self, single: ResourceId) -> DomainResult<Vec<ResourceId>> {
        let memberships = self.memberships.read().map_err(|_| poisoned())?;
        Ok(memberships
            .iter()
            .filter(|m| m.single == single)
            .map(|m| m.pool)
            .collect())
    }

    fn prices(&self, resource: ResourceId) -> DomainResult<Vec<Price>> {
        let prices = self.prices.read().map_err(|_| poisoned())?;
        Ok(prices
            .iter()
            .filter(|p| p.resource == resource)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reserva_products::PricingStrategy;

    fn seeded() -> (InMemoryCatalog, Resource, Resource, Resource) {
        let catalog = InMemoryCatalog::new();
        let pool = Resource::pool(ResourceId::new(), "Parking", PricingStrategy::Lowest).unwrap();
        let a = Resource::booking(ResourceId::new(), "Spot A").unwrap();
        let b = Resource::booking(ResourceId::new(), "Spot B").unwrap();
        for r in [&pool, &a, &b] {
            catalog.upsert_resource(r.clone()).unwrap();
        }
        (catalog, pool, a, b)
    }

    #[test]
    fn membership_is_visible_from_both_sides() {
        let (catalog, pool, a, b) = seeded();
        catalog.attach(pool.id_typed(), a.id_typed()).unwrap();
        catalog.attach(pool.id_typed(), b.id_typed()).unwrap();

        assert_eq!(
            catalog.members(pool.id_typed()).unwrap(),
            vec![a.id_typed(), b.id_typed()]
        );
        assert_eq!(catalog.pools_of(a.id_typed()).unwrap(), vec![pool.id_typed()]);

        assert!(catalog.detach(pool.id_typed(), a.id_typed()).unwrap());
        assert!(catalog.pools_of(a.id_typed()).unwrap().is_empty());
        assert_eq!(catalog.members(pool.id_typed()).unwrap(), vec![b.id_typed()]);
    }

    #[test]
    fn duplicate_and_invalid_links_are_rejected() {
        let (catalog, pool, a, b) = seeded();
        catalog.attach(pool.id_typed(), a.id_typed()).unwrap();
        assert!(matches!(
            catalog.attach(pool.id_typed(), a.id_typed()),
            Err(DomainError::Conflict(_))
        ));
        assert!(catalog.attach(a.id_typed(), b.id_typed()).is_err());
        assert_eq!(
            catalog.attach(pool.id_typed(), ResourceId::new()).unwrap_err(),
            DomainError::NotFound
        );
    }

    #[test]
    fn second_default_in_same_currency_is_rejected() {
        let (catalog, _pool, a, _b) = seeded();
        let id = a.id_typed();
        catalog.add_price(Price::new(id, 100, "USD").unwrap().as_default()).unwrap();
        catalog.add_price(Price::new(id, 90, "EUR").unwrap().as_default()).unwrap();
        assert_eq!(
            catalog.add_price(Price::new(id, 120, "usd").unwrap().as_default()).unwrap_err(),
            DomainError::AmbiguousDefaultPrice(id)
        );
        catalog.add_price(Price::new(id, 120, "USD").unwrap()).unwrap();
        assert_eq!(catalog.prices(id).unwrap().len(), 3);
    }
}
