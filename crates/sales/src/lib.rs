//! Cart lines for reservable resources.
//!
//! Holds the cart-line model and the pure readiness rules that decide whether
//! a line can go to checkout. Nothing here touches the stock ledger.

pub mod cart;
pub mod readiness;

pub use cart::{Cart, ReservationLine};
pub use readiness::{CartEvaluation, LineEvaluation, LineState, ReadinessInput, assess};
