use serde::{Deserialize, Serialize};

use glassbill_core::{TenantId, UserId};

/// What the session layer knows about the caller.
///
/// Mirrors the two facts an authentication layer exposes: whether the request
/// is authenticated, and the current principal name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityContext {
    principal_name: Option<String>,
    authenticated: bool,
}

impl IdentityContext {
    pub fn authenticated(principal_name: impl Into<String>) -> Self {
        Self {
            principal_name: Some(principal_name.into()),
            authenticated: true,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            principal_name: None,
            authenticated: false,
        }
    }

    pub fn principal_name(&self) -> Option<&str> {
        self.principal_name.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

/// Resolved tenant context for one request.
///
/// Immutable; produced by [`crate::TenantResolver`] and passed explicitly into
/// every billing operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    tenant_id: TenantId,
    user_id: UserId,
    actor: String,
    supplier_state: Option<String>,
}

impl TenantContext {
    pub fn new(
        tenant_id: TenantId,
        user_id: UserId,
        actor: impl Into<String>,
        supplier_state: Option<String>,
    ) -> Self {
        Self {
            tenant_id,
            user_id,
            actor: actor.into(),
            supplier_state,
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Username recorded as `createdBy` / `confirmedBy` on documents.
    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// The shop's registered state, compared with the customer's state to pick
    /// intra-state (CGST+SGST) or inter-state (IGST) tax.
    pub fn supplier_state(&self) -> Option<&str> {
        self.supplier_state.as_deref()
    }
}
