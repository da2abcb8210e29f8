//! Walks one shop through quote → confirm → invoice → payments on in-memory
//! stores and prints the rendered invoice.

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use rust_decimal::Decimal;

use glassbill_auth::IdentityContext;
use glassbill_core::{AggregateRoot, Money};
use glassbill_events::{EventBus, InMemoryEventBus};
use glassbill_infra::{
    BillingConfig, BillingEnvelope, BillingService, InMemoryAccountDirectory, NewPayment,
    NewQuotation, SystemClock,
};
use glassbill_invoicing::{InvoiceType, PaymentMode};
use glassbill_parties::CustomerDetails;
use glassbill_quotations::{DimensionUnit, QuotationItemInput};
use glassbill_tax::{BillingType, Charges};

fn main() -> anyhow::Result<()> {
    glassbill_observability::init();

    let directory = Arc::new(InMemoryAccountDirectory::new());
    let tenant_id = directory.add_shop("Sharma Glass House", Some("Maharashtra"));
    directory.add_account("asha", Some(tenant_id));

    let bus: Arc<InMemoryEventBus<BillingEnvelope>> = Arc::new(InMemoryEventBus::new());
    let audit = bus.subscribe();
    let service = BillingService::in_memory(
        directory,
        Arc::new(SystemClock),
        bus,
        BillingConfig::from_env(),
    );
    let asha = IdentityContext::authenticated("asha");

    let customer = service
        .register_customer(
            &asha,
            CustomerDetails {
                mobile: Some("9876543210".to_string()),
                state: Some("Maharashtra".to_string()),
                ..CustomerDetails::named("Meera Patil")
            },
        )
        .context("register customer")?;

    let quotation = service
        .create_quotation(
            &asha,
            NewQuotation {
                customer_id: *customer.id(),
                billing_type: BillingType::Gst,
                items: vec![QuotationItemInput {
                    glass_type: "Toughened".to_string(),
                    thickness: Some("10mm".to_string()),
                    design: None,
                    description: Some("Shower partition".to_string()),
                    height: Decimal::from(72),
                    height_unit: DimensionUnit::Inch,
                    width: Decimal::from(36),
                    width_unit: DimensionUnit::Inch,
                    quantity: 2,
                    rate_per_sq_ft: Decimal::from(180),
                    hsn_code: Some("7007".to_string()),
                }],
                charges: Charges {
                    installation_charge: Money::new(Decimal::from(500)),
                    ..Charges::default()
                },
                tax_percentage: Some(Decimal::from(18)),
                quotation_date: None,
                valid_until: None,
            },
        )
        .context("create quotation")?;
    service
        .confirm_quotation(&asha, *quotation.id())
        .context("confirm quotation")?;

    let invoice = service
        .create_invoice_from_quotation(&asha, *quotation.id(), InvoiceType::Standard, None)
        .context("create invoice")?;
    let (upi, cash) = invoice.grand_total().split_in_half();
    service
        .add_payment(&asha, *invoice.id(), NewPayment::new(PaymentMode::Upi, upi))
        .context("first payment")?;
    service
        .add_payment(
            &asha,
            *invoice.id(),
            NewPayment::new(PaymentMode::Cash, cash),
        )
        .context("second payment")?;

    let rendered = service
        .render_invoice(&asha, *invoice.id())
        .context("render invoice")?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&rendered)?;

    for envelope in audit.drain() {
        writeln!(
            stdout,
            "audit: {} #{} {}",
            envelope.event_type(),
            envelope.sequence_number(),
            envelope.aggregate_id()
        )?;
    }
    Ok(())
}
