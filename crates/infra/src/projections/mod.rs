//! Projection implementations (read model builders).
//!
//! Projections consume published ledger envelopes and build query-optimized
//! read models. All projections here are:
//! - **Rebuildable**: reconstructed from the event stream at any time
//! - **Idempotent**: safe for at-least-once delivery (sequence cursors)
//! - **Disposable**: the event stream is the source of truth

pub mod bank_levels;
pub mod donor_activity;

use thiserror::Error;

pub use bank_levels::{BankLevels, BankLevelsProjection};
pub use donor_activity::{DonorActivity, DonorActivityProjection};

/// Projection apply error.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("failed to deserialize ledger event: {0}")]
    Deserialize(String),

    #[error("stream mismatch: {0}")]
    StreamMismatch(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },

    #[error("projection state lock poisoned")]
    Poisoned,
}
