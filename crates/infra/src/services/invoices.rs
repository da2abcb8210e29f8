//! Invoice materialization and the payment ledger.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use glassbill_auth::IdentityContext;
use glassbill_core::{
    Aggregate, AggregateRoot, DomainError, ExpectedVersion, InvoiceId, Money, PaymentId,
    QuotationId,
};
use glassbill_events::EventBus;
use glassbill_invoicing::{
    Invoice, InvoiceCommand, InvoiceType, MaterializeInvoice, Payment, PaymentMetadata,
    PaymentMode, PaymentStatus, RecordPayment, SourceQuotation,
};

use super::{BillingService, load_owned};
use crate::audit::{BillingEnvelope, INVOICE_AGGREGATE};
use crate::error::ServiceResult;

/// Request to record money received against an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPayment {
    pub mode: PaymentMode,
    pub amount: Money,
    /// Defaults to today.
    pub payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub metadata: PaymentMetadata,
}

impl NewPayment {
    pub fn new(mode: PaymentMode, amount: Money) -> Self {
        Self {
            mode,
            amount,
            payment_date: None,
            metadata: PaymentMetadata::default(),
        }
    }
}

fn newest_first(invoices: &mut [Invoice]) {
    invoices.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| b.number().cmp(&a.number()))
    });
}

impl<B> BillingService<B>
where
    B: EventBus<BillingEnvelope>,
{
    /// Freeze a CONFIRMED quotation into an invoice numbered `INV-` or `ADV-`.
    ///
    /// Figures are copied, never recomputed. Nothing stops a second invoice
    /// from the same quotation.
    #[tracing::instrument(
        skip_all,
        fields(tenant_id = tracing::field::Empty, %quotation_id, ?invoice_type)
    )]
    pub fn create_invoice_from_quotation(
        &self,
        identity: &IdentityContext,
        quotation_id: QuotationId,
        invoice_type: InvoiceType,
        invoice_date: Option<NaiveDate>,
    ) -> ServiceResult<Invoice> {
        let ctx = self.tenant(identity)?;
        let quotation = self
            .quotations
            .find(&quotation_id)?
            .ok_or_else(DomainError::not_found)?;
        let source = SourceQuotation::read(&quotation)?;
        if let Err(e) = source.ensure_invoiceable_by(ctx.tenant_id()) {
            tracing::warn!(error = %e, "quotation cannot be invoiced");
            return Err(e.into());
        }

        let number = self
            .numbering
            .next(ctx.tenant_id(), invoice_type.document_kind())?;
        let invoice_id = InvoiceId::new();
        let mut invoice = Invoice::empty(invoice_id);
        let events = invoice.execute(&InvoiceCommand::MaterializeInvoice(MaterializeInvoice {
            tenant_id: ctx.tenant_id(),
            invoice_id,
            number,
            invoice_type,
            source,
            invoice_date: invoice_date.unwrap_or_else(|| self.clock.today()),
            created_by: ctx.actor().to_string(),
            occurred_at: self.clock.now(),
        }))?;
        self.invoices.save(invoice.clone(), ExpectedVersion::NoRecord)?;

        tracing::info!(
            %invoice_id,
            number = ?invoice.number().map(|n| n.as_str()),
            grand_total = %invoice.grand_total(),
            "invoice materialized"
        );
        self.publish(ctx.tenant_id(), invoice_id, INVOICE_AGGREGATE, 0, events);
        Ok(invoice)
    }

    /// Append a payment and recompute paid, due and status in the same write.
    ///
    /// A concurrent payment on the same invoice makes the write stale; the
    /// payment is then re-applied on top of the fresh ledger.
    #[tracing::instrument(
        skip_all,
        fields(tenant_id = tracing::field::Empty, %invoice_id, amount = %payment.amount, mode = ?payment.mode)
    )]
    pub fn add_payment(
        &self,
        identity: &IdentityContext,
        invoice_id: InvoiceId,
        payment: NewPayment,
    ) -> ServiceResult<Payment> {
        let ctx = self.tenant(identity)?;
        let payment_id = PaymentId::new();
        let payment_date = payment.payment_date.unwrap_or_else(|| self.clock.today());

        let result = self.with_write_retry("add_payment", || {
            let mut invoice = load_owned(&*self.invoices, &invoice_id, ctx.tenant_id())?;
            let base_version = invoice.version();
            let events = invoice.execute(&InvoiceCommand::RecordPayment(RecordPayment {
                tenant_id: ctx.tenant_id(),
                invoice_id,
                payment_id,
                mode: payment.mode,
                amount: payment.amount,
                payment_date,
                metadata: payment.metadata.clone(),
                created_by: ctx.actor().to_string(),
                occurred_at: self.clock.now(),
            }))?;
            self.invoices
                .save(invoice.clone(), ExpectedVersion::Exact(base_version))?;

            self.publish(ctx.tenant_id(), invoice_id, INVOICE_AGGREGATE, base_version, events);
            Ok(invoice)
        });

        let invoice = match result {
            Ok(invoice) => invoice,
            Err(e) => {
                tracing::warn!(error = %e, "payment not recorded");
                return Err(e);
            }
        };
        tracing::info!(
            %payment_id,
            paid = %invoice.paid_amount(),
            due = %invoice.due_amount(),
            status = ?invoice.payment_status(),
            "payment recorded"
        );

        invoice
            .payments()
            .iter()
            .find(|p| p.payment_id == payment_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found().into())
    }

    #[tracing::instrument(skip_all, fields(tenant_id = tracing::field::Empty, %invoice_id))]
    pub fn get_invoice(
        &self,
        identity: &IdentityContext,
        invoice_id: InvoiceId,
    ) -> ServiceResult<Invoice> {
        let ctx = self.tenant(identity)?;
        load_owned(&*self.invoices, &invoice_id, ctx.tenant_id())
    }

    /// The caller's invoices, newest first.
    #[tracing::instrument(skip_all, fields(tenant_id = tracing::field::Empty))]
    pub fn list_invoices(&self, identity: &IdentityContext) -> ServiceResult<Vec<Invoice>> {
        let ctx = self.tenant(identity)?;
        let mut invoices = self.invoices.list(ctx.tenant_id())?;
        newest_first(&mut invoices);
        Ok(invoices)
    }

    #[tracing::instrument(skip_all, fields(tenant_id = tracing::field::Empty, ?status))]
    pub fn list_invoices_by_payment_status(
        &self,
        identity: &IdentityContext,
        status: PaymentStatus,
    ) -> ServiceResult<Vec<Invoice>> {
        let mut invoices = self.list_invoices(identity)?;
        invoices.retain(|i| i.payment_status() == status);
        Ok(invoices)
    }

    /// Payments on one invoice, latest payment date first.
    #[tracing::instrument(skip_all, fields(tenant_id = tracing::field::Empty, %invoice_id))]
    pub fn list_payments(
        &self,
        identity: &IdentityContext,
        invoice_id: InvoiceId,
    ) -> ServiceResult<Vec<Payment>> {
        let ctx = self.tenant(identity)?;
        let invoice = load_owned(&*self.invoices, &invoice_id, ctx.tenant_id())?;
        Ok(invoice.payments_newest_first())
    }

    /// Render a stored invoice as-is.
    #[tracing::instrument(skip_all, fields(tenant_id = tracing::field::Empty, %invoice_id))]
    pub fn render_invoice(
        &self,
        identity: &IdentityContext,
        invoice_id: InvoiceId,
    ) -> ServiceResult<Vec<u8>> {
        let ctx = self.tenant(identity)?;
        let invoice = load_owned(&*self.invoices, &invoice_id, ctx.tenant_id())?;
        Ok(self.renderer.render_invoice(&invoice)?)
    }
}
