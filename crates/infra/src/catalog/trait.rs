use reserva_core::{DomainResult, ResourceId};
use reserva_products::{Price, Resource};

/// Repository lookup for resources, pool memberships and prices.
///
/// The reservation core resolves everything it needs through this port and
/// never depends on concrete persistence types.
pub trait Catalog: Send + Sync {
    /// Fails with `NotFound` for unknown ids.
    fn resource(&self, id: ResourceId) -> DomainResult<Resource>;

    /// Members of a pool in declaration order.
    fn members(&self, pool: ResourceId) -> DomainResult<Vec<ResourceId>>;

    /// Pools a single belongs to.
    fn pools_of(&self, single: ResourceId) -> DomainResult<Vec<ResourceId>>;

    fn prices(&self, resource: ResourceId) -> DomainResult<Vec<Price>>;
}
