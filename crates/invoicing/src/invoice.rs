use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use glassbill_core::{
    Aggregate, AggregateRoot, DocumentKind, DocumentNumber, DomainError, DomainResult, InvoiceId,
    Money, PaymentId, QuotationId, TenantId, TenantOwned,
};
use glassbill_events::Event;
use glassbill_parties::CustomerSnapshot;
use glassbill_quotations::{DimensionUnit, Quotation, QuotationItem, QuotationStatus};
use glassbill_tax::{BillingType, Charges, TaxBreakdown};

use crate::payment::{Payment, PaymentMetadata, PaymentMode, PaymentStatus, Settlement};

/// ADVANCE invoices are raised before delivery; STANDARD ones after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceType {
    #[default]
    Standard,
    Advance,
}

impl InvoiceType {
    /// Numbering sequence this invoice type draws from.
    pub fn document_kind(self) -> DocumentKind {
        match self {
            InvoiceType::Standard => DocumentKind::StandardInvoice,
            InvoiceType::Advance => DocumentKind::AdvanceInvoice,
        }
    }
}

/// Line item frozen from a quotation item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub item_order: u32,
    pub glass_type: String,
    pub thickness: Option<String>,
    pub design: Option<String>,
    pub description: Option<String>,
    pub height: Decimal,
    pub height_unit: DimensionUnit,
    pub width: Decimal,
    pub width_unit: DimensionUnit,
    pub quantity: u32,
    pub rate_per_sq_ft: Decimal,
    pub area_sq_ft: Decimal,
    pub subtotal: Decimal,
    pub hsn_code: Option<String>,
}

impl From<&QuotationItem> for InvoiceItem {
    fn from(item: &QuotationItem) -> Self {
        Self {
            item_order: item.item_order,
            glass_type: item.glass_type.clone(),
            thickness: item.thickness.clone(),
            design: item.design.clone(),
            description: item.description.clone(),
            height: item.height,
            height_unit: item.height_unit,
            width: item.width,
            width_unit: item.width_unit,
            quantity: item.quantity,
            rate_per_sq_ft: item.rate_per_sq_ft,
            area_sq_ft: item.area_sq_ft,
            subtotal: item.subtotal,
            hsn_code: item.hsn_code.clone(),
        }
    }
}

/// The quotation an invoice is materialized from, as read at command time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceQuotation {
    pub quotation_id: QuotationId,
    pub tenant_id: TenantId,
    pub number: DocumentNumber,
    pub status: QuotationStatus,
    pub customer: CustomerSnapshot,
    pub billing_type: BillingType,
    pub subtotal: Money,
    pub charges: Charges,
    pub tax: TaxBreakdown,
    pub items: Vec<QuotationItem>,
}

impl SourceQuotation {
    /// Fails with `NotFound` for a quotation that was never created or has
    /// been deleted.
    pub fn read(quotation: &Quotation) -> DomainResult<Self> {
        let (Some(tenant_id), Some(number), Some(customer), Some(tax)) = (
            quotation.tenant_id(),
            quotation.number(),
            quotation.customer(),
            quotation.tax(),
        ) else {
            return Err(DomainError::not_found());
        };
        if quotation.is_deleted() {
            return Err(DomainError::not_found());
        }

        Ok(Self {
            quotation_id: *quotation.id(),
            tenant_id,
            number: number.clone(),
            status: quotation.status(),
            customer: customer.clone(),
            billing_type: quotation.billing_type(),
            subtotal: quotation.subtotal(),
            charges: quotation.charges(),
            tax: *tax,
            items: quotation.items().to_vec(),
        })
    }

    /// Ownership, then CONFIRMED status.
    ///
    /// Services call this before allocating an invoice number.
    pub fn ensure_invoiceable_by(&self, tenant_id: TenantId) -> DomainResult<()> {
        if self.tenant_id != tenant_id {
            return Err(DomainError::cross_tenant());
        }
        if self.status != QuotationStatus::Confirmed {
            return Err(DomainError::QuotationNotConfirmed(format!(
                "{:?} for {}",
                self.status, self.number
            )));
        }
        Ok(())
    }
}

/// Aggregate root: Invoice.
///
/// Figures are fixed at materialization; only the payments and the derived
/// settlement change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    id: InvoiceId,
    tenant_id: Option<TenantId>,
    number: Option<DocumentNumber>,
    invoice_type: InvoiceType,
    quotation_id: Option<QuotationId>,
    quotation_number: Option<DocumentNumber>,
    invoice_date: Option<NaiveDate>,
    customer: Option<CustomerSnapshot>,
    billing_type: BillingType,
    subtotal: Money,
    charges: Charges,
    tax: Option<TaxBreakdown>,
    items: Vec<InvoiceItem>,
    payments: Vec<Payment>,
    settlement: Settlement,
    created_by: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Invoice {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: InvoiceId) -> Self {
        Self {
            id,
            tenant_id: None,
            number: None,
            invoice_type: InvoiceType::Standard,
            quotation_id: None,
            quotation_number: None,
            invoice_date: None,
            customer: None,
            billing_type: BillingType::Gst,
            subtotal: Money::zero(),
            charges: Charges::default(),
            tax: None,
            items: Vec::new(),
            payments: Vec::new(),
            settlement: Settlement {
                paid_amount: Money::zero(),
                due_amount: Money::zero(),
                payment_status: PaymentStatus::Due,
            },
            created_by: None,
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn number(&self) -> Option<&DocumentNumber> {
        self.number.as_ref()
    }

    pub fn invoice_type(&self) -> InvoiceType {
        self.invoice_type
    }

    pub fn quotation_id(&self) -> Option<QuotationId> {
        self.quotation_id
    }

    pub fn quotation_number(&self) -> Option<&DocumentNumber> {
        self.quotation_number.as_ref()
    }

    pub fn invoice_date(&self) -> Option<NaiveDate> {
        self.invoice_date
    }

    pub fn customer(&self) -> Option<&CustomerSnapshot> {
        self.customer.as_ref()
    }

    pub fn billing_type(&self) -> BillingType {
        self.billing_type
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn charges(&self) -> Charges {
        self.charges
    }

    pub fn tax(&self) -> Option<&TaxBreakdown> {
        self.tax.as_ref()
    }

    pub fn grand_total(&self) -> Money {
        self.tax.map(|t| t.grand_total).unwrap_or_default()
    }

    pub fn items(&self) -> &[InvoiceItem] {
        &self.items
    }

    /// Payments in the order they were recorded.
    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    /// Payments sorted by payment date, newest first.
    pub fn payments_newest_first(&self) -> Vec<Payment> {
        let mut payments = self.payments.clone();
        payments.sort_by(|a, b| {
            b.payment_date
                .cmp(&a.payment_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        payments
    }

    pub fn paid_amount(&self) -> Money {
        self.settlement.paid_amount
    }

    pub fn due_amount(&self) -> Money {
        self.settlement.due_amount
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.settlement.payment_status
    }

    pub fn created_by(&self) -> Option<&str> {
        self.created_by.as_deref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

impl AggregateRoot for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl TenantOwned for Invoice {
    fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }
}

/// Command: MaterializeInvoice. The number is allocated by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializeInvoice {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub number: DocumentNumber,
    pub invoice_type: InvoiceType,
    pub source: SourceQuotation,
    pub invoice_date: NaiveDate,
    pub created_by: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordPayment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPayment {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub payment_id: PaymentId,
    pub mode: PaymentMode,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub metadata: PaymentMetadata,
    pub created_by: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceCommand {
    MaterializeInvoice(MaterializeInvoice),
    RecordPayment(RecordPayment),
}

/// Event: InvoiceMaterialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceMaterialized {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub number: DocumentNumber,
    pub invoice_type: InvoiceType,
    pub quotation_id: QuotationId,
    pub quotation_number: DocumentNumber,
    pub invoice_date: NaiveDate,
    pub customer: CustomerSnapshot,
    pub billing_type: BillingType,
    pub subtotal: Money,
    pub charges: Charges,
    pub tax: TaxBreakdown,
    pub items: Vec<InvoiceItem>,
    pub created_by: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentRecorded. Carries the settlement after the payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecorded {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub payment: Payment,
    pub settlement: Settlement,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceEvent {
    InvoiceMaterialized(InvoiceMaterialized),
    PaymentRecorded(PaymentRecorded),
}

impl Event for InvoiceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InvoiceEvent::InvoiceMaterialized(_) => "billing.invoice.materialized",
            InvoiceEvent::PaymentRecorded(_) => "billing.invoice.payment_recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InvoiceEvent::InvoiceMaterialized(e) => e.occurred_at,
            InvoiceEvent::PaymentRecorded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Invoice {
    type Command = InvoiceCommand;
    type Event = InvoiceEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InvoiceEvent::InvoiceMaterialized(e) => {
                self.id = e.invoice_id;
                self.tenant_id = Some(e.tenant_id);
                self.number = Some(e.number.clone());
                self.invoice_type = e.invoice_type;
                self.quotation_id = Some(e.quotation_id);
                self.quotation_number = Some(e.quotation_number.clone());
                self.invoice_date = Some(e.invoice_date);
                self.customer = Some(e.customer.clone());
                self.billing_type = e.billing_type;
                self.subtotal = e.subtotal;
                self.charges = e.charges;
                self.tax = Some(e.tax);
                self.items = e.items.clone();
                self.payments.clear();
                self.settlement = Settlement::unpaid(e.tax.grand_total);
                self.created_by = Some(e.created_by.clone());
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.created = true;
            }
            InvoiceEvent::PaymentRecorded(e) => {
                self.payments.push(e.payment.clone());
                self.settlement = e.settlement;
                self.updated_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InvoiceCommand::MaterializeInvoice(cmd) => self.handle_materialize(cmd),
            InvoiceCommand::RecordPayment(cmd) => self.handle_record_payment(cmd),
        }
    }
}

impl Invoice {
    fn handle_materialize(&self, cmd: &MaterializeInvoice) -> DomainResult<Vec<InvoiceEvent>> {
        if self.created {
            return Err(DomainError::conflict("invoice already exists"));
        }

        let source = &cmd.source;
        source.ensure_invoiceable_by(cmd.tenant_id)?;
        if cmd.number.kind() != Some(cmd.invoice_type.document_kind()) {
            return Err(DomainError::validation(format!(
                "{} is not a {:?} invoice number",
                cmd.number, cmd.invoice_type
            )));
        }

        Ok(vec![InvoiceEvent::InvoiceMaterialized(InvoiceMaterialized {
            tenant_id: cmd.tenant_id,
            invoice_id: cmd.invoice_id,
            number: cmd.number.clone(),
            invoice_type: cmd.invoice_type,
            quotation_id: source.quotation_id,
            quotation_number: source.number.clone(),
            invoice_date: cmd.invoice_date,
            customer: source.customer.clone(),
            billing_type: source.billing_type,
            subtotal: source.subtotal,
            charges: source.charges,
            tax: source.tax,
            items: source.items.iter().map(InvoiceItem::from).collect(),
            created_by: cmd.created_by.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_payment(&self, cmd: &RecordPayment) -> DomainResult<Vec<InvoiceEvent>> {
        if !self.created || self.id != cmd.invoice_id {
            return Err(DomainError::not_found());
        }
        self.ensure_owned_by(cmd.tenant_id)?;

        let amount = cmd.amount.rounded();
        if !amount.is_positive() {
            return Err(DomainError::invalid_amount(format!(
                "payment amount must be positive, got {}",
                cmd.amount
            )));
        }
        if self.payments.iter().any(|p| p.payment_id == cmd.payment_id) {
            return Err(DomainError::conflict(format!(
                "payment {} already recorded",
                cmd.payment_id
            )));
        }

        let payment = Payment {
            payment_id: cmd.payment_id,
            mode: cmd.mode,
            amount,
            payment_date: cmd.payment_date,
            metadata: cmd.metadata.clone(),
            created_by: cmd.created_by.clone(),
            created_at: cmd.occurred_at,
        };
        let settlement = Settlement::of(
            self.grand_total(),
            self.payments.iter().chain(std::iter::once(&payment)),
        )?;

        Ok(vec![InvoiceEvent::PaymentRecorded(PaymentRecorded {
            tenant_id: cmd.tenant_id,
            invoice_id: cmd.invoice_id,
            payment,
            settlement,
            occurred_at: cmd.occurred_at,
        })])
    }
}
