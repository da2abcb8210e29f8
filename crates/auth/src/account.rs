use serde::{Deserialize, Serialize};

use glassbill_core::{TenantId, UserId};

/// A login account. Linked to at most one shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub user_id: UserId,
    pub username: String,
    pub tenant_id: Option<TenantId>,
}

/// A shop: the tenant that owns customers, quotations and invoices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    pub tenant_id: TenantId,
    pub shop_name: String,
    pub owner_name: Option<String>,
    pub gstin: Option<String>,
    pub state: Option<String>,
}

/// Read access to accounts and shops.
///
/// Implemented by the persistence layer; the resolver only reads.
pub trait AccountDirectory: Send + Sync {
    fn find_account(&self, username: &str) -> Option<UserAccount>;

    fn find_shop(&self, tenant_id: TenantId) -> Option<Shop>;
}

impl<D> AccountDirectory for std::sync::Arc<D>
where
    D: AccountDirectory + ?Sized,
{
    fn find_account(&self, username: &str) -> Option<UserAccount> {
        (**self).find_account(username)
    }

    fn find_shop(&self, tenant_id: TenantId) -> Option<Shop> {
        (**self).find_shop(tenant_id)
    }
}
