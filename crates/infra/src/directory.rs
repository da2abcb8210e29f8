//! In-memory account directory backing the tenant resolver.

use std::collections::HashMap;
use std::sync::RwLock;

use glassbill_auth::{AccountDirectory, Shop, UserAccount};
use glassbill_core::{TenantId, UserId};

/// Accounts keyed by username, shops keyed by tenant id.
#[derive(Debug, Default)]
pub struct InMemoryAccountDirectory {
    accounts: RwLock<HashMap<String, UserAccount>>,
    shops: RwLock<HashMap<TenantId, Shop>>,
}

impl InMemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shop and return its tenant id.
    pub fn add_shop(&self, shop_name: impl Into<String>, state: Option<&str>) -> TenantId {
        let tenant_id = TenantId::new();
        let shop = Shop {
            tenant_id,
            shop_name: shop_name.into(),
            owner_name: None,
            gstin: None,
            state: state.map(str::to_string),
        };
        if let Ok(mut shops) = self.shops.write() {
            shops.insert(tenant_id, shop);
        }
        tenant_id
    }

    /// Register a login; `tenant_id = None` models an account not yet linked
    /// to a shop.
    pub fn add_account(&self, username: impl Into<String>, tenant_id: Option<TenantId>) -> UserId {
        let account = UserAccount {
            user_id: UserId::new(),
            username: username.into(),
            tenant_id,
        };
        let user_id = account.user_id;
        if let Ok(mut accounts) = self.accounts.write() {
            accounts.insert(account.username.clone(), account);
        }
        user_id
    }

    pub fn remove_shop(&self, tenant_id: TenantId) {
        if let Ok(mut shops) = self.shops.write() {
            shops.remove(&tenant_id);
        }
    }
}

impl AccountDirectory for InMemoryAccountDirectory {
    fn find_account(&self, username: &str) -> Option<UserAccount> {
        self.accounts.read().ok()?.get(username).cloned()
    }

    fn find_shop(&self, tenant_id: TenantId) -> Option<Shop> {
        self.shops.read().ok()?.get(&tenant_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use glassbill_auth::{IdentityContext, ResolveError, TenantResolver};

    #[test]
    fn resolver_reads_through_the_directory() {
        let directory = Arc::new(InMemoryAccountDirectory::new());
        let tenant_id = directory.add_shop("Sharma Glass House", Some("Maharashtra"));
        directory.add_account("asha", Some(tenant_id));
        directory.add_account("ravi", None);

        let resolver = TenantResolver::new(directory.clone());
        let ctx = resolver
            .resolve(&IdentityContext::authenticated("asha"))
            .unwrap();
        assert_eq!(ctx.tenant_id(), tenant_id);
        assert_eq!(ctx.supplier_state(), Some("Maharashtra"));

        assert_eq!(
            resolver.resolve(&IdentityContext::authenticated("ravi")),
            Err(ResolveError::NoTenantAssigned("ravi".to_string()))
        );

        directory.remove_shop(tenant_id);
        assert_eq!(
            resolver.resolve(&IdentityContext::authenticated("asha")),
            Err(ResolveError::NoTenantAssigned("asha".to_string()))
        );
    }
}
