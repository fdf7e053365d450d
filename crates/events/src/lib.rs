//! `hemobank-events` — event contracts and distribution mechanics.
//!
//! The `Event` trait, the stream `EventEnvelope`, and the pub/sub
//! `EventBus` abstraction with an in-memory realization for tests/dev.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
