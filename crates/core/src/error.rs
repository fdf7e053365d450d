//! Domain error model.

use thiserror::Error;

use crate::blood_type::BloodType;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every variant is a recoverable, value-level outcome; none is
/// process-fatal, and a failed operation leaves state unchanged.
/// Infrastructure concerns (storage, publication) have their own error types.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The donor identity already has a registration record.
    #[error("donor is already registered")]
    AlreadyRegistered,

    /// The donor identity has no registration record.
    #[error("donor is not registered")]
    DonorNotRegistered,

    /// A unit amount of zero was supplied.
    #[error("unit amount must be positive")]
    InvalidAmount,

    /// The bank holds fewer units of this type than requested.
    #[error("insufficient stock of {0}")]
    InsufficientStock(BloodType),

    /// No donor type compatible with this recipient has stock on hand.
    #[error("no compatible stock for recipient type {0}")]
    NoCompatibleStock(BloodType),

    /// An integer blood-type code outside 0..=7 reached the boundary.
    #[error("invalid blood type code: {0}")]
    InvalidBloodType(u8),
}
