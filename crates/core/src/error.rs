//! Domain error model.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::id::ResourceId;

/// Result type used across the reservation core.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every variant is an expected, caller-recoverable condition. Availability
/// failures (`InsufficientCapacity`, `NotEnoughAvailable`) are surfaced to the
/// caller as typed results rather than swallowed into silent fallbacks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A conflict occurred (lock timeout, poisoned store).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Permanent stock of a resource would go negative.
    #[error("insufficient capacity on {resource}: requested {requested}, available {available}")]
    InsufficientCapacity {
        resource: ResourceId,
        requested: i64,
        available: i64,
    },

    /// A pool (or window) cannot satisfy the requested quantity.
    #[error("not enough available: requested {requested}, available {available}")]
    NotEnoughAvailable { requested: i64, available: i64 },

    /// `start >= end`.
    #[error("invalid window: {start} is not before {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// A time-bound resource was asked for without a window.
    #[error("resource {0} requires a reservation window")]
    MissingWindow(ResourceId),

    /// No own price and no priced, available singles.
    #[error("no price resolvable for {0}")]
    NoPriceResolvable(ResourceId),

    /// Several prices exist but not exactly one is marked default.
    #[error("resource {0} has several prices but no single default")]
    AmbiguousDefaultPrice(ResourceId),

    /// A pool has no singles attached to claim from.
    #[error("pool {0} has no members")]
    PoolHasNoMembers(ResourceId),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// True for conditions a shopper can resolve by changing the request
    /// (dates, quantity) rather than by fixing configuration.
    pub fn is_unavailability(&self) -> bool {
        matches!(
            self,
            Self::InsufficientCapacity { .. } | Self::NotEnoughAvailable { .. }
        )
    }
}
