//! Customer address book.

use glassbill_auth::IdentityContext;
use glassbill_core::{Aggregate, AggregateRoot, CustomerId, ExpectedVersion};
use glassbill_events::EventBus;
use glassbill_parties::{Customer, CustomerCommand, CustomerDetails, RegisterCustomer, UpdateCustomer};

use super::{BillingService, load_owned};
use crate::audit::{BillingEnvelope, CUSTOMER_AGGREGATE};
use crate::error::ServiceResult;

impl<B> BillingService<B>
where
    B: EventBus<BillingEnvelope>,
{
    #[tracing::instrument(skip_all, fields(tenant_id = tracing::field::Empty))]
    pub fn register_customer(
        &self,
        identity: &IdentityContext,
        details: CustomerDetails,
    ) -> ServiceResult<Customer> {
        let ctx = self.tenant(identity)?;
        let customer_id = CustomerId::new();

        let mut customer = Customer::empty(customer_id);
        let events = customer.execute(&CustomerCommand::RegisterCustomer(RegisterCustomer {
            tenant_id: ctx.tenant_id(),
            customer_id,
            details,
            occurred_at: self.clock.now(),
        }))?;
        self.customers.save(customer.clone(), ExpectedVersion::NoRecord)?;

        tracing::info!(%customer_id, "customer registered");
        self.publish(ctx.tenant_id(), customer_id, CUSTOMER_AGGREGATE, 0, events);
        Ok(customer)
    }

    #[tracing::instrument(skip_all, fields(tenant_id = tracing::field::Empty, %customer_id))]
    pub fn get_customer(
        &self,
        identity: &IdentityContext,
        customer_id: CustomerId,
    ) -> ServiceResult<Customer> {
        let ctx = self.tenant(identity)?;
        load_owned(&*self.customers, &customer_id, ctx.tenant_id())
    }

    /// Replace the editable details. Documents already issued keep their
    /// snapshot.
    #[tracing::instrument(skip_all, fields(tenant_id = tracing::field::Empty, %customer_id))]
    pub fn update_customer(
        &self,
        identity: &IdentityContext,
        customer_id: CustomerId,
        details: CustomerDetails,
    ) -> ServiceResult<Customer> {
        let ctx = self.tenant(identity)?;

        self.with_write_retry("update_customer", || {
            let mut customer = load_owned(&*self.customers, &customer_id, ctx.tenant_id())?;
            let base_version = customer.version();
            let events = customer.execute(&CustomerCommand::UpdateCustomer(UpdateCustomer {
                tenant_id: ctx.tenant_id(),
                customer_id,
                details: details.clone(),
                occurred_at: self.clock.now(),
            }))?;
            self.customers
                .save(customer.clone(), ExpectedVersion::Exact(base_version))?;

            tracing::info!("customer updated");
            self.publish(ctx.tenant_id(), customer_id, CUSTOMER_AGGREGATE, base_version, events);
            Ok(customer)
        })
    }

    /// All customers of the caller's shop, by name.
    #[tracing::instrument(skip_all, fields(tenant_id = tracing::field::Empty))]
    pub fn list_customers(&self, identity: &IdentityContext) -> ServiceResult<Vec<Customer>> {
        let ctx = self.tenant(identity)?;
        let mut customers = self.customers.list(ctx.tenant_id())?;
        customers.sort_by_cached_key(|c| c.name().to_lowercase());
        Ok(customers)
    }

    /// Case-insensitive name substring search; a blank query lists everyone.
    #[tracing::instrument(skip_all, fields(tenant_id = tracing::field::Empty))]
    pub fn search_customers(
        &self,
        identity: &IdentityContext,
        query: &str,
    ) -> ServiceResult<Vec<Customer>> {
        let needle = query.trim().to_lowercase();
        let mut customers = self.list_customers(identity)?;
        if !needle.is_empty() {
            customers.retain(|c| c.name().to_lowercase().contains(&needle));
        }
        Ok(customers)
    }
}
