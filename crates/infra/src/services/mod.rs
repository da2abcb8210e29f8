//! Application services for the billing core.
//!
//! Every operation follows the same pipeline:
//!
//! ```text
//! IdentityContext
//!   ↓
//! 1. Resolve tenant (fails before any read)
//!   ↓
//! 2. Load aggregate by id, check ownership
//!   ↓
//! 3. Handle command (pure decision, produces events)
//!   ↓
//! 4. Save with the version the decision was made against
//!   ↓
//! 5. Publish committed events (failure is logged, not returned)
//! ```
//!
//! Stale writes in step 4 are re-run from step 2 a bounded number of times,
//! so a lost race is re-decided on fresh state rather than overwritten.

mod customers;
mod invoices;
mod quotations;

pub use invoices::NewPayment;
pub use quotations::NewQuotation;

use std::sync::Arc;

use uuid::Uuid;

use glassbill_auth::{AccountDirectory, IdentityContext, TenantContext, TenantResolver};
use glassbill_core::{AggregateRoot, DomainError, TenantId, TenantOwned};
use glassbill_events::EventBus;
use glassbill_invoicing::Invoice;
use glassbill_parties::Customer;
use glassbill_quotations::Quotation;

use crate::audit::{BillingEnvelope, BillingEvent};
use crate::clock::Clock;
use crate::config::BillingConfig;
use crate::error::ServiceResult;
use crate::numbering::{DocumentNumberRegistry, InMemoryDocumentNumberRegistry, NumberingGenerator};
use crate::rendering::{DocumentRenderer, PlainTextRenderer};
use crate::repository::{InMemoryRepository, Repository};

/// Storage and collaborator ports a [`BillingService`] is assembled from.
pub struct BillingPorts {
    pub directory: Arc<dyn AccountDirectory>,
    pub customers: Arc<dyn Repository<Customer>>,
    pub quotations: Arc<dyn Repository<Quotation>>,
    pub invoices: Arc<dyn Repository<Invoice>>,
    pub numbers: Arc<dyn DocumentNumberRegistry>,
    pub clock: Arc<dyn Clock>,
    pub renderer: Arc<dyn DocumentRenderer>,
}

impl BillingPorts {
    /// In-memory stores and the plain-text renderer around `directory`.
    pub fn in_memory(directory: Arc<dyn AccountDirectory>, clock: Arc<dyn Clock>) -> Self {
        Self {
            directory,
            customers: Arc::new(InMemoryRepository::<Customer>::new()),
            quotations: Arc::new(InMemoryRepository::<Quotation>::new()),
            invoices: Arc::new(InMemoryRepository::<Invoice>::new()),
            numbers: Arc::new(InMemoryDocumentNumberRegistry::new()),
            clock,
            renderer: Arc::new(PlainTextRenderer),
        }
    }
}

/// Customers, quotations, invoices and payments for many shops.
///
/// Stateless between calls: all state lives behind the ports, so one
/// instance can be shared across request threads.
pub struct BillingService<B> {
    resolver: TenantResolver<Arc<dyn AccountDirectory>>,
    customers: Arc<dyn Repository<Customer>>,
    quotations: Arc<dyn Repository<Quotation>>,
    invoices: Arc<dyn Repository<Invoice>>,
    numbering: NumberingGenerator,
    clock: Arc<dyn Clock>,
    renderer: Arc<dyn DocumentRenderer>,
    bus: B,
    config: BillingConfig,
}

impl<B> core::fmt::Debug for BillingService<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BillingService")
            .field("numbering", &self.numbering)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<B> BillingService<B>
where
    B: EventBus<BillingEnvelope>,
{
    pub fn new(ports: BillingPorts, bus: B, config: BillingConfig) -> Self {
        let resolver = TenantResolver::with_anonymous_principals(
            ports.directory,
            config.anonymous_principals.clone(),
        );
        let numbering = NumberingGenerator::new(
            ports.numbers,
            ports.clock.clone(),
            config.numbering_max_attempts,
        );

        Self {
            resolver,
            customers: ports.customers,
            quotations: ports.quotations,
            invoices: ports.invoices,
            numbering,
            clock: ports.clock,
            renderer: ports.renderer,
            bus,
            config,
        }
    }

    /// Fully in-memory service (tests/dev).
    pub fn in_memory(
        directory: Arc<dyn AccountDirectory>,
        clock: Arc<dyn Clock>,
        bus: B,
        config: BillingConfig,
    ) -> Self {
        Self::new(BillingPorts::in_memory(directory, clock), bus, config)
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Step 1 of every operation.
    fn tenant(&self, identity: &IdentityContext) -> ServiceResult<TenantContext> {
        match self.resolver.resolve(identity) {
            Ok(ctx) => {
                tracing::Span::current().record("tenant_id", tracing::field::display(ctx.tenant_id()));
                Ok(ctx)
            }
            Err(e) => {
                tracing::warn!(error = %e, "tenant resolution failed");
                Err(e.into())
            }
        }
    }

    /// Run `operation` again while it loses optimistic-concurrency races.
    fn with_write_retry<T>(
        &self,
        action: &'static str,
        mut operation: impl FnMut() -> ServiceResult<T>,
    ) -> ServiceResult<T> {
        let mut attempt = 1;
        loop {
            match operation() {
                Err(e) if e.is_concurrency_conflict() && attempt < self.config.write_max_attempts => {
                    tracing::warn!(action, attempt, error = %e, "stale write; re-deciding");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Publish events committed at versions `base_version + 1 ..`.
    fn publish<E>(
        &self,
        tenant_id: TenantId,
        aggregate_id: impl Into<Uuid> + Copy,
        aggregate_type: &'static str,
        base_version: u64,
        events: Vec<E>,
    ) where
        E: Into<BillingEvent>,
    {
        for (sequence_number, event) in (base_version + 1..).zip(events) {
            let envelope = BillingEnvelope::wrap(
                tenant_id,
                aggregate_id,
                aggregate_type,
                sequence_number,
                event.into(),
            );
            let event_type = envelope.event_type().to_string();
            if let Err(e) = self.bus.publish(envelope) {
                tracing::warn!(%tenant_id, %event_type, error = ?e, "audit publish failed");
            }
        }
    }
}

/// Load `id` and verify it belongs to `tenant_id`.
///
/// A missing record is `NotFound`; a record of another shop is
/// `CrossTenantAccess` and is never returned.
fn load_owned<A>(
    repo: &dyn Repository<A>,
    id: &A::Id,
    tenant_id: TenantId,
) -> ServiceResult<A>
where
    A: AggregateRoot + TenantOwned,
{
    let aggregate = repo.find(id)?.ok_or_else(DomainError::not_found)?;
    aggregate.ensure_owned_by(tenant_id)?;
    Ok(aggregate)
}
