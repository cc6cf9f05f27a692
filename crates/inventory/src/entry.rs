use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reserva_core::{EntryId, Reference, ResourceId, Window};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Increase,
    Decrease,
    Claim,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Completed,
}

/// Immutable record of a stock movement against a resource.
///
/// `quantity` is signed: INCREASE is positive, DECREASE and CLAIM are
/// negative. The only field that ever changes after append is `status`, when
/// a PENDING claim is released or swept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub resource: ResourceId,
    pub kind: MovementKind,
    pub quantity: i64,
    pub status: EntryStatus,
    pub window_start: Option<DateTime<Utc>>,
    /// "Expires at".
    pub window_end: Option<DateTime<Utc>>,
    pub reference: Option<Reference>,
    pub note: Option<String>,
    /// Set on the DECREASE half of a claim pair: the id of its CLAIM.
    pub pairs_with: Option<EntryId>,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Units affected, regardless of direction.
    pub fn units(&self) -> i64 {
        self.quantity.abs()
    }

    pub fn is_pending_claim(&self) -> bool {
        self.kind == MovementKind::Claim && self.status == EntryStatus::Pending
    }

    /// A pending claim whose window has not yet ended.
    pub fn is_active_claim(&self, now: DateTime<Utc>) -> bool {
        self.is_pending_claim() && self.window_end.is_none_or(|end| end > now)
    }

    /// Permanent stock movements: unwindowed INCREASE/DECREASE outside a claim pair.
    pub fn counts_toward_capacity(&self) -> bool {
        matches!(self.kind, MovementKind::Increase | MovementKind::Decrease)
            && self.window_end.is_none()
            && self.pairs_with.is_none()
    }

    pub fn window(&self) -> Option<Window> {
        match (self.window_start, self.window_end) {
            (Some(start), Some(end)) => Window::new(start, end).ok(),
            _ => None,
        }
    }

    pub fn is_owned_by(&self, reference: &Reference) -> bool {
        self.reference.as_ref() == Some(reference)
    }
}

/// Command: record a stock movement.
///
/// `quantity` is the positive magnitude; the ledger assigns the sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub kind: MovementKind,
    pub quantity: i64,
    pub window: Option<Window>,
    pub reference: Option<Reference>,
    pub note: Option<String>,
}

impl Movement {
    pub fn increase(quantity: i64) -> Self {
        Self {
            kind: MovementKind::Increase,
            quantity,
            window: None,
            reference: None,
            note: None,
        }
    }

    pub fn decrease(quantity: i64) -> Self {
        Self {
            kind: MovementKind::Decrease,
            ..Self::increase(quantity)
        }
    }

    pub fn claim(quantity: i64, window: Option<Window>, reference: Reference) -> Self {
        Self {
            kind: MovementKind::Claim,
            quantity,
            window,
            reference: Some(reference),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }
}
