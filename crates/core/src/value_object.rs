//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects with **no identity** - they are defined
//! entirely by their attribute values, are immutable, and behave like
//! primitives (copied and compared, never mutated in place).

/// Marker trait for value objects.
///
/// Requires `Clone` (values are cheap to copy), `PartialEq` (compared by
/// attribute values) and `Debug` (loggable).
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
