//! Infrastructure layer: event store, command pipeline, read models, and
//! the externally callable ledger service.

pub mod command_dispatcher;
pub mod event_store;
pub mod projections;
pub mod service;


pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent};
pub use projections::{
    BankLevels, BankLevelsProjection, DonorActivity, DonorActivityProjection, ProjectionError,
};
pub use service::{LEDGER_AGGREGATE_TYPE, LedgerService};
