//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every variant is a deterministic, request-scoped business failure. None of
/// them are fatal to the process; infrastructure concerns (storage, rendering,
/// identity lookup) have their own error types and are wrapped at the service
/// boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input, empty item list).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The requested quotation, invoice or customer does not exist.
    #[error("not found")]
    NotFound,

    /// The record belongs to a different tenant than the caller.
    #[error("record belongs to another tenant")]
    CrossTenantAccess,

    /// Illegal lifecycle transition (e.g. confirming a rejected quotation).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Payment amount was zero or negative.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Discount was negative or larger than the amount it applies to.
    #[error("invalid discount: {0}")]
    InvalidDiscount(String),

    /// Tax percentage outside `[0, 100]` (or missing where required).
    #[error("invalid tax rate: {0}")]
    InvalidTaxRate(String),

    /// An invoice was requested from a quotation that is not CONFIRMED.
    #[error("quotation is not confirmed (status: {0})")]
    QuotationNotConfirmed(String),

    /// A document number was already taken by a concurrent writer.
    #[error("document number already issued: {0}")]
    NumberingConflict(String),

    /// Optimistic concurrency failure (stale aggregate version).
    #[error("conflict: {0}")]
    Conflict(String),

    /// An identifier or document number could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }

    pub fn invalid_discount(msg: impl Into<String>) -> Self {
        Self::InvalidDiscount(msg.into())
    }

    pub fn invalid_tax_rate(msg: impl Into<String>) -> Self {
        Self::InvalidTaxRate(msg.into())
    }

    pub fn numbering_conflict(number: impl Into<String>) -> Self {
        Self::NumberingConflict(number.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn cross_tenant() -> Self {
        Self::CrossTenantAccess
    }
}
