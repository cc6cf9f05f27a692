//! Stock ledger domain module.
//!
//! This crate contains the business rules for stock movements and
//! availability, implemented purely as deterministic functions over a
//! resource's ledger entries (no IO, no locking, no storage).

pub mod entry;
pub mod stock;

pub use entry::{EntryStatus, LedgerEntry, Movement, MovementKind};
pub use stock::{
    PlannedMovement, StockLevel, StockPolicy, UNLIMITED, available, capacity, claimed_quantity,
    plan_movement,
};
