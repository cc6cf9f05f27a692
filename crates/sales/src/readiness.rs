use serde::{Deserialize, Serialize};

use reserva_core::LineId;

use crate::cart::ReservationLine;

/// Whether a cart line can go to checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineState {
    Ready,
    NotReadyMissingWindow,
    NotReadyInvalidWindow,
    NotReadyUnavailable,
}

impl LineState {
    pub fn is_ready(self) -> bool {
        self == LineState::Ready
    }
}

/// Facts about the line's resource that the line itself does not carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessInput {
    pub requires_window: bool,
    pub is_pool: bool,
    /// Units left for this line after the ledger and any earlier sibling lines
    /// in the same cart are accounted for.
    pub remaining: i64,
}

/// Classify a line. Pure: reads the line, never the ledger.
pub fn assess(line: &ReservationLine, input: &ReadinessInput) -> LineState {
    match (line.window_start, line.window_end) {
        (Some(start), Some(end)) if start >= end => return LineState::NotReadyInvalidWindow,
        (Some(_), Some(_)) => {}
        (None, None) if !input.requires_window => {}
        _ => return LineState::NotReadyMissingWindow,
    }

    if input.is_pool && line.allocated_single.is_none() {
        return LineState::NotReadyUnavailable;
    }
    match line.line_price {
        Some(price) if price > 0 => {}
        _ => return LineState::NotReadyUnavailable,
    }
    if input.remaining < line.quantity {
        return LineState::NotReadyUnavailable;
    }
    LineState::Ready
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineEvaluation {
    pub line: LineId,
    pub state: LineState,
    pub price: Option<i64>,
    pub subtotal: Option<i64>,
}

impl LineEvaluation {
    pub fn of(line: &ReservationLine, state: LineState) -> Self {
        Self {
            line: line.id,
            state,
            price: line.line_price,
            subtotal: line.line_subtotal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEvaluation {
    pub lines: Vec<LineEvaluation>,
    pub ready: bool,
}

impl CartEvaluation {
    /// A cart is ready iff every line is ready. An empty cart is not.
    pub fn from_lines(lines: Vec<LineEvaluation>) -> Self {
        let ready = !lines.is_empty() && lines.iter().all(|l| l.state.is_ready());
        Self { lines, ready }
    }
}
