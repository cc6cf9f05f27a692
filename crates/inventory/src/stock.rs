use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reserva_core::{
    DomainError, DomainResult, EntryId, Reference, ResourceId, Window, windows_overlap,
};
use reserva_products::Resource;

use crate::entry::{EntryStatus, LedgerEntry, Movement, MovementKind};

/// Availability reported for resources that do not track stock.
pub const UNLIMITED: i64 = i64::MAX;

/// How the ledger treats a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPolicy {
    /// Pools carry no entries of their own.
    pub ledgered: bool,
    pub tracks_stock: bool,
    pub allow_backorders: bool,
    pub requires_window: bool,
}

impl From<&Resource> for StockPolicy {
    fn from(resource: &Resource) -> Self {
        Self {
            ledgered: !resource.is_pool(),
            tracks_stock: resource.tracks_stock(),
            allow_backorders: resource.allows_backorders(),
            requires_window: resource.requires_window(),
        }
    }
}

/// Permanent stock level: unwindowed INCREASE/DECREASE outside claim pairs.
pub fn capacity(entries: &[LedgerEntry]) -> i64 {
    entries
        .iter()
        .filter(|e| e.counts_toward_capacity())
        .map(|e| e.quantity)
        .sum()
}

/// Units held by active claims overlapping `window`.
///
/// An absent window on either side is unbounded. Claims whose window ended at
/// or before `now` are expired and no longer count. Claims owned by any of
/// `excluding` are ignored (a line re-checking its own hold).
pub fn claimed_quantity(
    entries: &[LedgerEntry],
    window: Option<&Window>,
    now: DateTime<Utc>,
    excluding: &[Reference],
) -> i64 {
    entries
        .iter()
        .filter(|e| e.is_active_claim(now))
        .filter(|e| !excluding.iter().any(|r| e.is_owned_by(r)))
        .filter(|e| windows_overlap(e.window().as_ref(), window))
        .map(LedgerEntry::units)
        .sum()
}

/// `capacity - claimed` for stock-tracked resources, `UNLIMITED` otherwise.
pub fn available(
    policy: &StockPolicy,
    entries: &[LedgerEntry],
    window: Option<&Window>,
    now: DateTime<Utc>,
    excluding: &[Reference],
) -> i64 {
    if !policy.tracks_stock {
        return UNLIMITED;
    }
    capacity(entries) - claimed_quantity(entries, window, now, excluding)
}

/// A point-in-time view of one resource's stock for a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub capacity: i64,
    pub claimed: i64,
    pub available: i64,
}

impl StockLevel {
    pub fn compute(
        policy: &StockPolicy,
        entries: &[LedgerEntry],
        window: Option<&Window>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            capacity: capacity(entries),
            claimed: claimed_quantity(entries, window, now, &[]),
            available: available(policy, entries, window, now, &[]),
        }
    }
}

/// Entries a movement appends. A claim produces a CLAIM plus its paired DECREASE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMovement {
    pub primary: LedgerEntry,
    pub paired: Option<LedgerEntry>,
}

impl PlannedMovement {
    pub fn into_entries(self) -> Vec<LedgerEntry> {
        let mut entries = vec![self.primary];
        entries.extend(self.paired);
        entries
    }
}

/// Decide which entries a movement appends, given the resource's current entries.
///
/// Pure: never mutates `entries`. Fails with `InsufficientCapacity` when the
/// resulting availability would go negative for a stock-tracked resource
/// without backorders.
pub fn plan_movement(
    resource: ResourceId,
    policy: &StockPolicy,
    entries: &[LedgerEntry],
    movement: &Movement,
    now: DateTime<Utc>,
) -> DomainResult<PlannedMovement> {
    if !policy.ledgered {
        return Err(DomainError::validation(
            "pool resources never carry their own ledger entries",
        ));
    }
    if movement.quantity <= 0 {
        return Err(DomainError::validation("movement quantity must be positive"));
    }

    let enforce = policy.tracks_stock && !policy.allow_backorders;
    let base = LedgerEntry {
        id: EntryId::new(),
        resource,
        kind: movement.kind,
        quantity: 0,
        status: EntryStatus::Completed,
        window_start: None,
        window_end: None,
        reference: movement.reference,
        note: movement.note.clone(),
        pairs_with: None,
        recorded_at: now,
    };

    match movement.kind {
        MovementKind::Increase | MovementKind::Decrease => {
            if movement.window.is_some() {
                return Err(DomainError::validation(
                    "only claims may be bounded by a window",
                ));
            }
            if movement.kind == MovementKind::Increase {
                return Ok(PlannedMovement {
                    primary: LedgerEntry {
                        quantity: movement.quantity,
                        ..base
                    },
                    paired: None,
                });
            }

            let remaining = available(policy, entries, None, now, &[]);
            if enforce && remaining < movement.quantity {
                return Err(DomainError::InsufficientCapacity {
                    resource,
                    requested: movement.quantity,
                    available: remaining.max(0),
                });
            }
            Ok(PlannedMovement {
                primary: LedgerEntry {
                    quantity: -movement.quantity,
                    ..base
                },
                paired: None,
            })
        }
        MovementKind::Claim => {
            if policy.requires_window && movement.window.is_none() {
                return Err(DomainError::MissingWindow(resource));
            }
            if movement.reference.is_none() {
                return Err(DomainError::validation("a claim needs a reference"));
            }

            let window = movement.window.as_ref();
            let remaining = available(policy, entries, window, now, &[]);
            if enforce && remaining < movement.quantity {
                return Err(DomainError::InsufficientCapacity {
                    resource,
                    requested: movement.quantity,
                    available: remaining.max(0),
                });
            }

            let claim = LedgerEntry {
                quantity: -movement.quantity,
                status: EntryStatus::Pending,
                window_start: window.map(Window::start),
                window_end: window.map(Window::end),
                ..base.clone()
            };
            let decrease = LedgerEntry {
                id: EntryId::new(),
                kind: MovementKind::Decrease,
                quantity: -movement.quantity,
                status: EntryStatus::Completed,
                window_end: window.map(Window::end),
                pairs_with: Some(claim.id),
                ..base
            };
            Ok(PlannedMovement {
                primary: claim,
                paired: Some(decrease),
            })
        }
    }
}
