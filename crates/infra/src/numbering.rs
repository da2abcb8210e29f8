//! Document number allocation.
//!
//! The next number is `count(issued numbers with this kind+month prefix) + 1`,
//! claimed through an atomic [`DocumentNumberRegistry::reserve`] that enforces
//! uniqueness per tenant. A lost race is retried with a recomputed candidate
//! that is always greater than the one that just failed, up to a bounded
//! number of attempts, and then surfaces as `NumberingConflict`.
//!
//! Reserved numbers are never released, so a deleted draft's number is not
//! handed out again.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use glassbill_core::{DocumentKind, DocumentNumber, DomainError, NumberingPeriod, TenantId};

use crate::clock::Clock;
use crate::error::ServiceResult;
use crate::repository::StoreError;

/// Uniqueness constraint on `(tenant, document number)`.
pub trait DocumentNumberRegistry: Send + Sync {
    /// How many numbers starting with `prefix` the tenant has issued.
    fn count_with_prefix(&self, tenant_id: TenantId, prefix: &str) -> Result<u32, StoreError>;

    /// Claim `number`; fails with [`StoreError::Duplicate`] if already taken.
    fn reserve(&self, tenant_id: TenantId, number: &DocumentNumber) -> Result<(), StoreError>;

    fn is_reserved(&self, tenant_id: TenantId, number: &DocumentNumber) -> Result<bool, StoreError>;
}

impl<R> DocumentNumberRegistry for Arc<R>
where
    R: DocumentNumberRegistry + ?Sized,
{
    fn count_with_prefix(&self, tenant_id: TenantId, prefix: &str) -> Result<u32, StoreError> {
        (**self).count_with_prefix(tenant_id, prefix)
    }

    fn reserve(&self, tenant_id: TenantId, number: &DocumentNumber) -> Result<(), StoreError> {
        (**self).reserve(tenant_id, number)
    }

    fn is_reserved(&self, tenant_id: TenantId, number: &DocumentNumber) -> Result<bool, StoreError> {
        (**self).is_reserved(tenant_id, number)
    }
}

/// In-memory registry for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryDocumentNumberRegistry {
    issued: Mutex<HashMap<TenantId, BTreeSet<String>>>,
}

impl InMemoryDocumentNumberRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentNumberRegistry for InMemoryDocumentNumberRegistry {
    fn count_with_prefix(&self, tenant_id: TenantId, prefix: &str) -> Result<u32, StoreError> {
        let issued = self.issued.lock().map_err(|_| StoreError::poisoned())?;
        let count = issued
            .get(&tenant_id)
            .map(|numbers| {
                numbers
                    .range(prefix.to_string()..)
                    .take_while(|n| n.starts_with(prefix))
                    .count()
            })
            .unwrap_or(0);
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    fn reserve(&self, tenant_id: TenantId, number: &DocumentNumber) -> Result<(), StoreError> {
        let mut issued = self.issued.lock().map_err(|_| StoreError::poisoned())?;
        if issued
            .entry(tenant_id)
            .or_default()
            .insert(number.as_str().to_string())
        {
            Ok(())
        } else {
            Err(StoreError::Duplicate(number.to_string()))
        }
    }

    fn is_reserved(&self, tenant_id: TenantId, number: &DocumentNumber) -> Result<bool, StoreError> {
        let issued = self.issued.lock().map_err(|_| StoreError::poisoned())?;
        Ok(issued
            .get(&tenant_id)
            .is_some_and(|numbers| numbers.contains(number.as_str())))
    }
}

/// Produces `{PREFIX}-{YYYY}-{MM}-{NNNN}` numbers for the current month.
pub struct NumberingGenerator {
    registry: Arc<dyn DocumentNumberRegistry>,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
}

impl core::fmt::Debug for NumberingGenerator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NumberingGenerator")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl NumberingGenerator {
    pub fn new(
        registry: Arc<dyn DocumentNumberRegistry>,
        clock: Arc<dyn Clock>,
        max_attempts: u32,
    ) -> Self {
        Self {
            registry,
            clock,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Allocate and reserve the next number of `kind` for `tenant_id`.
    pub fn next(&self, tenant_id: TenantId, kind: DocumentKind) -> ServiceResult<DocumentNumber> {
        let period = NumberingPeriod::of(self.clock.today());
        let prefix = period.prefix_for(kind);
        let mut last_tried = 0u32;

        for attempt in 1..=self.max_attempts {
            let issued = self.registry.count_with_prefix(tenant_id, &prefix)?;
            let sequence = issued.saturating_add(1).max(last_tried.saturating_add(1));
            let number = DocumentNumber::format(kind, period, sequence)?;

            match self.registry.reserve(tenant_id, &number) {
                Ok(()) => {
                    tracing::debug!(%tenant_id, %number, attempt, "document number reserved");
                    return Ok(number);
                }
                Err(StoreError::Duplicate(_)) => {
                    tracing::warn!(%tenant_id, %number, attempt, "document number taken; retrying");
                    last_tried = sequence;
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(DomainError::numbering_conflict(format!(
            "{prefix}* after {} attempts",
            self.max_attempts
        ))
        .into())
    }
}
