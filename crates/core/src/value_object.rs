//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Windows and amounts are compared by their attributes; a `Window` from
/// 10:00 to 12:00 is the same window wherever it was built. To "change" one,
/// build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
