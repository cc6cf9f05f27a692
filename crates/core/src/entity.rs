//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Resources and cart lines are entities: two resources with identical
/// attributes are still different things to reserve.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
