//! Service-level error type.
//!
//! Application services return [`ServiceError`]; callers that only care about
//! the business outcome match on [`ServiceError::kind`].

use thiserror::Error;

use glassbill_auth::ResolveError;
use glassbill_core::DomainError;

use crate::rendering::RenderError;
use crate::repository::StoreError;

/// Flat error taxonomy exposed to callers (HTTP layer, CLI, tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unauthenticated,
    PrincipalNotFound,
    NoTenantAssigned,
    CrossTenantAccess,
    NotFound,
    InvalidState,
    InvalidAmount,
    InvalidDiscount,
    InvalidTaxRate,
    QuotationNotConfirmed,
    NumberingConflict,
    Validation,
    /// Lost an optimistic-concurrency race more times than allowed.
    Conflict,
    Storage,
    Rendering,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Resolve(e) => match e {
                ResolveError::Unauthenticated => ErrorKind::Unauthenticated,
                ResolveError::PrincipalNotFound(_) => ErrorKind::PrincipalNotFound,
                ResolveError::NoTenantAssigned(_) => ErrorKind::NoTenantAssigned,
            },
            ServiceError::Domain(e) => match e {
                DomainError::Validation(_) | DomainError::InvalidId(_) => ErrorKind::Validation,
                DomainError::NotFound => ErrorKind::NotFound,
                DomainError::CrossTenantAccess => ErrorKind::CrossTenantAccess,
                DomainError::InvalidState(_) => ErrorKind::InvalidState,
                DomainError::InvalidAmount(_) => ErrorKind::InvalidAmount,
                DomainError::InvalidDiscount(_) => ErrorKind::InvalidDiscount,
                DomainError::InvalidTaxRate(_) => ErrorKind::InvalidTaxRate,
                DomainError::QuotationNotConfirmed(_) => ErrorKind::QuotationNotConfirmed,
                DomainError::NumberingConflict(_) => ErrorKind::NumberingConflict,
                DomainError::Conflict(_) => ErrorKind::Conflict,
            },
            ServiceError::Store(e) => match e {
                StoreError::Concurrency(_) => ErrorKind::Conflict,
                StoreError::Duplicate(_) => ErrorKind::NumberingConflict,
                StoreError::Unavailable(_) => ErrorKind::Storage,
            },
            ServiceError::Render(_) => ErrorKind::Rendering,
        }
    }

    /// Stale optimistic write; the operation may be re-decided on fresh state.
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(
            self,
            ServiceError::Store(StoreError::Concurrency(_))
                | ServiceError::Domain(DomainError::Conflict(_))
        )
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
