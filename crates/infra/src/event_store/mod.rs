//! Append-only event store boundary.
//!
//! An infrastructure-facing abstraction for storing and loading aggregate
//! event streams without making any storage assumptions. The persistence
//! engine behind the trait is deliberately unspecified; the in-memory
//! realization serves tests/dev.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
