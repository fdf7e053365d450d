//! Inventory domain module.
//!
//! Authoritative per-type stock counters and running aggregates of the bank,
//! implemented purely as deterministic domain logic (no IO, no storage).

pub mod stock;

pub use stock::{Inventory, InventorySnapshot};
