//! Stock ledger persistence: the transactional port and its adapters.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::{InMemoryLedgerStore, InMemoryLedgerTx};
pub use r#trait::{LedgerRead, LedgerStore, LedgerTransaction};
