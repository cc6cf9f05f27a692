use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reserva_core::{CartId, DomainError, DomainResult, Entity, LineId, Reference, ResourceId, Window};
use reserva_products::{PriceSource, ResolvedPrice, booking_line_price};

/// A cart line requesting `quantity` of `resource` over an optional window.
///
/// For pool resources `allocated_single` names the concrete single backing
/// the line. Price fields are derived and recomputed whenever the window
/// changes; `None` marks the line unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationLine {
    pub id: LineId,
    pub resource: ResourceId,
    pub allocated_single: Option<ResourceId>,
    pub selected_price: Option<PriceSource>,
    pub quantity: i64,
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: Option<DateTime<Utc>>,
    pub unit_amount: Option<i64>,
    pub line_price: Option<i64>,
    pub line_subtotal: Option<i64>,
    pub currency: Option<String>,
}

impl ReservationLine {
    pub fn new(
        resource: ResourceId,
        quantity: i64,
        window_start: Option<DateTime<Utc>>,
        window_end: Option<DateTime<Utc>>,
    ) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        Ok(Self {
            id: LineId::new(),
            resource,
            allocated_single: None,
            selected_price: None,
            quantity,
            window_start,
            window_end,
            unit_amount: None,
            line_price: None,
            line_subtotal: None,
            currency: None,
        })
    }

    /// The reference this line's claims are recorded under.
    pub fn reference(&self) -> Reference {
        Reference::cart_line(self.id)
    }

    /// The window, when both bounds are present and well-ordered.
    pub fn window(&self) -> Option<Window> {
        match (self.window_start, self.window_end) {
            (Some(start), Some(end)) => Window::new(start, end).ok(),
            _ => None,
        }
    }

    pub fn set_window(&mut self, window: Option<Window>) {
        self.window_start = window.map(|w| w.start());
        self.window_end = window.map(|w| w.end());
    }

    /// The resource whose stock backs this line: the allocated single for
    /// pools, the requested resource otherwise.
    pub fn stock_target(&self, is_pool: bool) -> Option<ResourceId> {
        if is_pool {
            self.allocated_single
        } else {
            Some(self.resource)
        }
    }

    /// Store a resolved unit price; time-bound lines are prorated over the window.
    pub fn apply_price(&mut self, resolved: Option<ResolvedPrice>, time_bound: bool) {
        let Some(resolved) = resolved else {
            self.clear_price();
            return;
        };
        let line_price = match (time_bound, self.window()) {
            (true, Some(window)) => booking_line_price(resolved.amount, &window),
            _ => resolved.amount,
        };
        self.unit_amount = Some(resolved.amount);
        self.line_price = Some(line_price);
        self.line_subtotal = line_price.checked_mul(self.quantity);
        self.selected_price = Some(resolved.source);
        self.currency = Some(resolved.currency);
    }

    pub fn clear_price(&mut self) {
        self.selected_price = None;
        self.unit_amount = None;
        self.line_price = None;
        self.line_subtotal = None;
        self.currency = None;
    }

    /// UNAVAILABLE: no single, no price.
    pub fn mark_unavailable(&mut self) {
        self.allocated_single = None;
        self.clear_price();
    }
}

impl Entity for ReservationLine {
    type Id = LineId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A shopper's cart: an ordered list of lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub lines: Vec<ReservationLine>,
}

impl Cart {
    pub fn new(id: CartId) -> Self {
        Self {
            id,
            lines: Vec::new(),
        }
    }

    pub fn line(&self, id: LineId) -> Option<&ReservationLine> {
        self.lines.iter().find(|l| l.id == id)
    }

    pub fn line_mut(&mut self, id: LineId) -> Option<&mut ReservationLine> {
        self.lines.iter_mut().find(|l| l.id == id)
    }

    pub fn remove(&mut self, id: LineId) -> Option<ReservationLine> {
        let idx = self.lines.iter().position(|l| l.id == id)?;
        Some(self.lines.remove(idx))
    }

    /// Every reference the cart's lines hold claims under.
    pub fn references(&self) -> Vec<Reference> {
        self.lines.iter().map(ReservationLine::reference).collect()
    }

    /// Sum of line subtotals; `None` while any line is unpriced.
    pub fn subtotal(&self) -> Option<i64> {
        self.lines
            .iter()
            .try_fold(0i64, |acc, l| acc.checked_add(l.line_subtotal?))
    }
}

impl Entity for Cart {
    type Id = CartId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
