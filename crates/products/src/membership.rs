use serde::{Deserialize, Serialize};

use reserva_core::{DomainError, DomainResult, ResourceId};

use crate::resource::Resource;

/// Link between a pool and one of its singles.
///
/// A single record serves both directions (pool → single and single → pool),
/// so a one-way link cannot exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolMembership {
    pub pool: ResourceId,
    pub single: ResourceId,
}

impl PoolMembership {
    pub fn link(pool: &Resource, single: &Resource) -> DomainResult<Self> {
        if !pool.is_pool() {
            return Err(DomainError::validation(format!(
                "{} is not a pool",
                pool.name()
            )));
        }
        if !single.is_single() {
            return Err(DomainError::validation(format!(
                "{} cannot back a pool",
                single.name()
            )));
        }
        Ok(Self {
            pool: pool.id_typed(),
            single: single.id_typed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::PricingStrategy;

    #[test]
    fn links_pool_to_single() {
        let pool = Resource::pool(ResourceId::new(), "Suites", PricingStrategy::Lowest).unwrap();
        let room = Resource::booking(ResourceId::new(), "Suite 1").unwrap();
        let link = PoolMembership::link(&pool, &room).unwrap();
        assert_eq!(link.pool, pool.id_typed());
        assert_eq!(link.single, room.id_typed());
    }

    #[test]
    fn rejects_pool_inside_pool() {
        let outer = Resource::pool(ResourceId::new(), "Outer", PricingStrategy::Lowest).unwrap();
        let inner = Resource::pool(ResourceId::new(), "Inner", PricingStrategy::Lowest).unwrap();
        assert!(PoolMembership::link(&outer, &inner).is_err());
        let room = Resource::booking(ResourceId::new(), "Room").unwrap();
        assert!(PoolMembership::link(&room, &outer).is_err());
    }
}
