use thiserror::Error;

use crate::{AccountDirectory, IdentityContext, TenantContext};

/// Principal names the session layer uses for "nobody is logged in".
pub const DEFAULT_ANONYMOUS_PRINCIPALS: &[&str] = &["anonymousUser", "guest"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("caller is not authenticated")]
    Unauthenticated,

    #[error("no account for principal '{0}'")]
    PrincipalNotFound(String),

    #[error("account '{0}' is not linked to any shop")]
    NoTenantAssigned(String),
}

/// Maps an authenticated principal to exactly one tenant.
///
/// - No IO beyond the injected directory
/// - No side effects
#[derive(Debug, Clone)]
pub struct TenantResolver<D> {
    directory: D,
    anonymous_principals: Vec<String>,
}

impl<D: AccountDirectory> TenantResolver<D> {
    pub fn new(directory: D) -> Self {
        Self::with_anonymous_principals(
            directory,
            DEFAULT_ANONYMOUS_PRINCIPALS.iter().map(|s| s.to_string()).collect(),
        )
    }

    pub fn with_anonymous_principals(directory: D, anonymous_principals: Vec<String>) -> Self {
        Self {
            directory,
            anonymous_principals,
        }
    }

    pub fn resolve(&self, identity: &IdentityContext) -> Result<TenantContext, ResolveError> {
        let username = match identity.principal_name() {
            Some(name) if identity.is_authenticated() && !self.is_anonymous(name) => name,
            _ => return Err(ResolveError::Unauthenticated),
        };

        let account = self
            .directory
            .find_account(username)
            .ok_or_else(|| ResolveError::PrincipalNotFound(username.to_string()))?;

        // An account pointing at a shop that no longer exists is treated as unlinked.
        let shop = account
            .tenant_id
            .and_then(|tenant_id| self.directory.find_shop(tenant_id))
            .ok_or_else(|| ResolveError::NoTenantAssigned(account.username.clone()))?;

        tracing::debug!(username, tenant_id = %shop.tenant_id, "resolved tenant");

        Ok(TenantContext::new(
            shop.tenant_id,
            account.user_id,
            account.username,
            shop.state,
        ))
    }

    fn is_anonymous(&self, name: &str) -> bool {
        name.trim().is_empty() || self.anonymous_principals.iter().any(|a| a == name)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use glassbill_core::{TenantId, UserId};

    use super::*;
    use crate::{Shop, UserAccount};

    #[derive(Default)]
    struct Directory {
        accounts: HashMap<String, UserAccount>,
        shops: HashMap<TenantId, Shop>,
    }

    impl AccountDirectory for Directory {
        fn find_account(&self, username: &str) -> Option<UserAccount> {
            self.accounts.get(username).cloned()
        }

        fn find_shop(&self, tenant_id: TenantId) -> Option<Shop> {
            self.shops.get(&tenant_id).cloned()
        }
    }

    fn directory() -> (Directory, TenantId) {
        let tenant_id = TenantId::new();
        let mut dir = Directory::default();
        dir.shops.insert(
            tenant_id,
            Shop {
                tenant_id,
                shop_name: "Clear View Glass".to_string(),
                owner_name: None,
                gstin: Some("27AAAPL1234C1ZV".to_string()),
                state: Some("Maharashtra".to_string()),
            },
        );
        dir.accounts.insert(
            "asha".to_string(),
            UserAccount {
                user_id: UserId::new(),
                username: "asha".to_string(),
                tenant_id: Some(tenant_id),
            },
        );
        dir.accounts.insert(
            "drifter".to_string(),
            UserAccount {
                user_id: UserId::new(),
                username: "drifter".to_string(),
                tenant_id: None,
            },
        );
        (dir, tenant_id)
    }

    #[test]
    fn resolves_linked_account_to_its_shop() {
        let (dir, tenant_id) = directory();
        let resolver = TenantResolver::new(dir);

        let ctx = resolver
            .resolve(&IdentityContext::authenticated("asha"))
            .unwrap();

        assert_eq!(ctx.tenant_id(), tenant_id);
        assert_eq!(ctx.actor(), "asha");
        assert_eq!(ctx.supplier_state(), Some("Maharashtra"));
    }

    #[test]
    fn anonymous_and_unauthenticated_callers_are_rejected() {
        let (dir, _) = directory();
        let resolver = TenantResolver::new(dir);

        assert_eq!(
            resolver.resolve(&IdentityContext::anonymous()),
            Err(ResolveError::Unauthenticated)
        );
        assert_eq!(
            resolver.resolve(&IdentityContext::authenticated("anonymousUser")),
            Err(ResolveError::Unauthenticated)
        );
        assert_eq!(
            resolver.resolve(&IdentityContext::authenticated("  ")),
            Err(ResolveError::Unauthenticated)
        );
    }

    #[test]
    fn unknown_principal_is_not_found() {
        let (dir, _) = directory();
        let resolver = TenantResolver::new(dir);

        assert_eq!(
            resolver.resolve(&IdentityContext::authenticated("mallory")),
            Err(ResolveError::PrincipalNotFound("mallory".to_string()))
        );
    }

    #[test]
    fn account_without_shop_has_no_tenant() {
        let (dir, _) = directory();
        let resolver = TenantResolver::new(dir);

        assert_eq!(
            resolver.resolve(&IdentityContext::authenticated("drifter")),
            Err(ResolveError::NoTenantAssigned("drifter".to_string()))
        );
    }

    #[test]
    fn custom_anonymous_names_are_honoured() {
        let (dir, _) = directory();
        let resolver = TenantResolver::with_anonymous_principals(dir, vec!["asha".to_string()]);

        assert_eq!(
            resolver.resolve(&IdentityContext::authenticated("asha")),
            Err(ResolveError::Unauthenticated)
        );
    }
}
