//! Aggregate root traits for the billing documents.

use crate::error::{DomainError, DomainResult};
use crate::id::TenantId;

/// Aggregate root marker + minimal interface.
///
/// Quotations and invoices are aggregate roots: their child rows (items,
/// payments) are only reachable through them and are stored and deleted
/// with them.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the aggregate's state.
    ///
    /// Incremented once per applied event.
    fn version(&self) -> u64;
}

/// Ownership accessor for tenant-scoped records.
pub trait TenantOwned {
    /// Owning tenant, or `None` for a not-yet-created aggregate.
    fn tenant_id(&self) -> Option<TenantId>;

    /// Fail with `CrossTenantAccess` unless the record belongs to `tenant_id`.
    ///
    /// Comparison is by tenant identity, never by reference.
    fn ensure_owned_by(&self, tenant_id: TenantId) -> DomainResult<()> {
        match self.tenant_id() {
            Some(owner) if owner == tenant_id => Ok(()),
            Some(_) => Err(DomainError::cross_tenant()),
            None => Err(DomainError::not_found()),
        }
    }
}

/// Optimistic concurrency expectation for an aggregate write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// The record must not exist yet.
    NoRecord,
    /// Require the stored aggregate to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: Option<u64>) -> bool {
        match (self, actual) {
            (ExpectedVersion::NoRecord, None) => true,
            (ExpectedVersion::Exact(v), Some(a)) => v == a,
            _ => false,
        }
    }

    pub fn check(self, actual: Option<u64>) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual:?})"
            )))
        }
    }
}

/// Aggregate execution semantics (pure, deterministic).
///
/// - **Decision logic**: `handle(&self, cmd)` returns events.
/// - **State mutation**: `apply(&mut self, event)` evolves state.
///
/// Aggregates perform no IO. Timestamps, actors and document numbers arrive
/// on the command.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Evolve in-memory state from a single event (+1 version).
    fn apply(&mut self, event: &Self::Event);

    /// Decide which events to emit given the current state and a command.
    ///
    /// This must not mutate state.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Handle a command and apply the resulting events in order.
    fn execute(&mut self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let events = self.handle(command)?;
        for event in &events {
            self.apply(event);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_version_matches_only_the_right_state() {
        assert!(ExpectedVersion::NoRecord.matches(None));
        assert!(!ExpectedVersion::NoRecord.matches(Some(1)));
        assert!(ExpectedVersion::Exact(2).matches(Some(2)));
        assert!(!ExpectedVersion::Exact(2).matches(Some(3)));
        assert!(!ExpectedVersion::Exact(2).matches(None));
    }

    #[test]
    fn stale_version_is_a_conflict() {
        let err = ExpectedVersion::Exact(1).check(Some(2)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    struct Owned(Option<TenantId>);

    impl TenantOwned for Owned {
        fn tenant_id(&self) -> Option<TenantId> {
            self.0
        }
    }

    #[test]
    fn ownership_check_distinguishes_foreign_and_missing_records() {
        let mine = TenantId::new();
        let theirs = TenantId::new();

        assert!(Owned(Some(mine)).ensure_owned_by(mine).is_ok());
        assert_eq!(
            Owned(Some(theirs)).ensure_owned_by(mine),
            Err(DomainError::CrossTenantAccess)
        );
        assert_eq!(Owned(None).ensure_owned_by(mine), Err(DomainError::NotFound));
    }
}
