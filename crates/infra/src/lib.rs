//! Infrastructure layer: ledger and catalog ports, in-memory adapters,
//! reservation services, and configuration.

pub mod catalog;
pub mod config;
pub mod ledger_store;
pub mod reservations;
pub mod services;

pub use reservations::{
    AvailabilityCheck, CheckoutReceipt, PoolClaimResult, PoolReleaseResult, ReservationService,
    WindowChange,
};


#[cfg(test)]
mod test_support;
