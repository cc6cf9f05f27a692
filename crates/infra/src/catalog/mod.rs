//! Resource, membership and price lookup.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryCatalog;
pub use r#trait::Catalog;
