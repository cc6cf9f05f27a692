//! Strongly-typed identifiers used across the reservation core.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a reservable resource (simple, booking or pool).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(Uuid);

/// Identifier of a price row belonging to a resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceId(Uuid);

/// Identifier of an immutable stock ledger entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

/// Identifier of a cart.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartId(Uuid);

/// Identifier of a cart line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(Uuid);

macro_rules! impl_uuid_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

impl_uuid_newtype!(ResourceId, "ResourceId");
impl_uuid_newtype!(PriceId, "PriceId");
impl_uuid_newtype!(EntryId, "EntryId");
impl_uuid_newtype!(CartId, "CartId");
impl_uuid_newtype!(LineId, "LineId");

/// What a claim reference points at.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    CartLine,
    Purchase,
    /// Back-office holds, maintenance blocks, imports.
    Manual,
}

/// Polymorphic owner of a claim: `{kind, id}`.
///
/// The core never resolves the pointee; it only compares references.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub kind: ReferenceKind,
    pub id: Uuid,
}

impl Reference {
    pub fn new(kind: ReferenceKind, id: Uuid) -> Self {
        Self { kind, id }
    }

    pub fn cart_line(line: LineId) -> Self {
        Self::new(ReferenceKind::CartLine, line.into())
    }

    pub fn purchase(id: Uuid) -> Self {
        Self::new(ReferenceKind::Purchase, id)
    }

    pub fn manual(id: Uuid) -> Self {
        Self::new(ReferenceKind::Manual, id)
    }
}

impl core::fmt::Display for Reference {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let kind = match self.kind {
            ReferenceKind::CartLine => "cart_line",
            ReferenceKind::Purchase => "purchase",
            ReferenceKind::Manual => "manual",
        };
        write!(f, "{kind}:{}", self.id)
    }
}
