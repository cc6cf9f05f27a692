//! `reserva-core`: building blocks shared by every reservation crate.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the claim `Reference`, half-open `Window`s, the injected
//! `Clock`, and the error taxonomy.

pub mod clock;
pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;
pub mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CartId, EntryId, LineId, PriceId, Reference, ReferenceKind, ResourceId};
pub use money::div_round_half_up;
pub use value_object::ValueObject;
pub use window::{Window, windows_overlap};
