//! `glassbill-auth`: identity boundary and tenant resolution.
//!
//! This crate is decoupled from HTTP and storage: the session layer hands in
//! an [`IdentityContext`], account lookups go through the [`AccountDirectory`]
//! trait, and the result is an explicit [`TenantContext`] that every billing
//! operation takes as a parameter.

pub mod account;
pub mod principal;
pub mod resolver;

pub use account::{AccountDirectory, Shop, UserAccount};
pub use principal::{IdentityContext, TenantContext};
pub use resolver::{ResolveError, TenantResolver};
