//! Versioned aggregate repositories.
//!
//! Aggregates are stored as current state plus version. Every write states
//! the version it was decided against ([`ExpectedVersion`]); a stale write
//! fails with [`StoreError::Concurrency`] and stores nothing. Child rows
//! (items, payments) live inside the aggregate and are written and deleted
//! with it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use glassbill_core::{AggregateRoot, ExpectedVersion, TenantId, TenantOwned};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Stored version differs from the expected one.
    #[error("concurrency conflict: {0}")]
    Concurrency(String),

    /// A uniqueness constraint rejected the write.
    #[error("duplicate key: {0}")]
    Duplicate(String),

    /// The backing store could not be used (e.g. poisoned lock).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub(crate) fn poisoned() -> Self {
        StoreError::Unavailable("lock poisoned".to_string())
    }
}

/// Persistence port for one aggregate type.
///
/// Lookups are by id only; tenant ownership is checked by the caller on the
/// returned record so that foreign records surface as `CrossTenantAccess`
/// rather than silently disappearing.
pub trait Repository<A>: Send + Sync
where
    A: AggregateRoot,
{
    fn find(&self, id: &A::Id) -> Result<Option<A>, StoreError>;

    /// Insert or replace `aggregate`, which must have been decided against
    /// `expected`.
    fn save(&self, aggregate: A, expected: ExpectedVersion) -> Result<(), StoreError>;

    fn delete(&self, id: &A::Id, expected: ExpectedVersion) -> Result<(), StoreError>;

    /// Every record owned by `tenant_id`, in no particular order.
    fn list(&self, tenant_id: TenantId) -> Result<Vec<A>, StoreError>;
}

impl<A, S> Repository<A> for Arc<S>
where
    A: AggregateRoot,
    S: Repository<A> + ?Sized,
{
    fn find(&self, id: &A::Id) -> Result<Option<A>, StoreError> {
        (**self).find(id)
    }

    fn save(&self, aggregate: A, expected: ExpectedVersion) -> Result<(), StoreError> {
        (**self).save(aggregate, expected)
    }

    fn delete(&self, id: &A::Id, expected: ExpectedVersion) -> Result<(), StoreError> {
        (**self).delete(id, expected)
    }

    fn list(&self, tenant_id: TenantId) -> Result<Vec<A>, StoreError> {
        (**self).list(tenant_id)
    }
}

/// In-memory repository for tests/dev.
#[derive(Debug)]
pub struct InMemoryRepository<A: AggregateRoot> {
    inner: RwLock<HashMap<A::Id, A>>,
}

impl<A: AggregateRoot> InMemoryRepository<A> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<A: AggregateRoot> Default for InMemoryRepository<A> {
    fn default() -> Self {
        Self::new()
    }
}

fn check_version(
    expected: ExpectedVersion,
    actual: Option<u64>,
    id: &impl core::fmt::Debug,
) -> Result<(), StoreError> {
    if expected.matches(actual) {
        Ok(())
    } else {
        Err(StoreError::Concurrency(format!(
            "{id:?}: expected {expected:?}, found {actual:?}"
        )))
    }
}

impl<A> Repository<A> for InMemoryRepository<A>
where
    A: AggregateRoot + TenantOwned + Clone + Send + Sync,
    A::Id: Send + Sync,
{
    fn find(&self, id: &A::Id) -> Result<Option<A>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(map.get(id).cloned())
    }

    fn save(&self, aggregate: A, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::poisoned())?;
        let id = aggregate.id().clone();
        check_version(expected, map.get(&id).map(|a| a.version()), &id)?;
        map.insert(id, aggregate);
        Ok(())
    }

    fn delete(&self, id: &A::Id, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::poisoned())?;
        check_version(expected, map.get(id).map(|a| a.version()), id)?;
        map.remove(id);
        Ok(())
    }

    fn list(&self, tenant_id: TenantId) -> Result<Vec<A>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(map
            .values()
            .filter(|a| a.tenant_id() == Some(tenant_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Doc {
        id: u32,
        tenant_id: TenantId,
        version: u64,
    }

    impl AggregateRoot for Doc {
        type Id = u32;

        fn id(&self) -> &u32 {
            &self.id
        }

        fn version(&self) -> u64 {
            self.version
        }
    }

    impl TenantOwned for Doc {
        fn tenant_id(&self) -> Option<TenantId> {
            Some(self.tenant_id)
        }
    }

    #[test]
    fn stale_save_is_rejected_and_leaves_state_untouched() {
        let repo = InMemoryRepository::new();
        let tenant_id = TenantId::new();
        repo.save(Doc { id: 1, tenant_id, version: 1 }, ExpectedVersion::NoRecord)
            .unwrap();
        repo.save(Doc { id: 1, tenant_id, version: 2 }, ExpectedVersion::Exact(1))
            .unwrap();

        let err = repo
            .save(Doc { id: 1, tenant_id, version: 2 }, ExpectedVersion::Exact(1))
            .unwrap_err();
        assert!(matches!(err, StoreError::Concurrency(_)));

        let err = repo
            .save(Doc { id: 1, tenant_id, version: 1 }, ExpectedVersion::NoRecord)
            .unwrap_err();
        assert!(matches!(err, StoreError::Concurrency(_)));
        assert_eq!(repo.find(&1).unwrap().unwrap().version, 2);
    }

    #[test]
    fn list_is_tenant_scoped() {
        let repo = InMemoryRepository::new();
        let a = TenantId::new();
        let b = TenantId::new();
        for (id, tenant_id) in [(1, a), (2, a), (3, b)] {
            repo.save(Doc { id, tenant_id, version: 1 }, ExpectedVersion::NoRecord)
                .unwrap();
        }

        let mut ids: Vec<_> = repo.list(a).unwrap().into_iter().map(|d| d.id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(repo.list(b).unwrap().len(), 1);
    }

    #[test]
    fn delete_checks_version() {
        let repo = InMemoryRepository::new();
        let tenant_id = TenantId::new();
        repo.save(Doc { id: 7, tenant_id, version: 3 }, ExpectedVersion::NoRecord)
            .unwrap();

        assert!(repo.delete(&7, ExpectedVersion::Exact(2)).is_err());
        repo.delete(&7, ExpectedVersion::Exact(3)).unwrap();
        assert_eq!(repo.find(&7).unwrap(), None);
    }
}
