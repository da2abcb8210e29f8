use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use glassbill_core::{
    Aggregate, AggregateRoot, DocumentKind, DocumentNumber, DomainError, DomainResult, Money,
    QuotationId, TenantId, TenantOwned,
};
use glassbill_events::Event;
use glassbill_parties::CustomerSnapshot;
use glassbill_tax::{BillingType, Charges, TaxBreakdown, TaxInput};

use crate::item::{QuotationItem, QuotationItemInput, price_items};

/// Quotation status lifecycle. CONFIRMED and REJECTED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuotationStatus {
    Draft,
    Confirmed,
    Rejected,
}

/// Everything the user supplies to price a new quotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationDraft {
    pub customer: CustomerSnapshot,
    pub billing_type: BillingType,
    pub items: Vec<QuotationItemInput>,
    pub charges: Charges,
    pub tax_percentage: Option<Decimal>,
    pub quotation_date: NaiveDate,
    pub valid_until: Option<NaiveDate>,
}

/// Computed figures of a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub items: Vec<QuotationItem>,
    pub subtotal: Money,
    pub tax: TaxBreakdown,
}

impl QuotationDraft {
    /// Validate the draft and compute items, subtotal and tax.
    ///
    /// Callers run this before allocating a document number so that an
    /// invalid draft never consumes one.
    pub fn price(&self, supplier_state: Option<&str>) -> DomainResult<Pricing> {
        if let Some(valid_until) = self.valid_until {
            if valid_until < self.quotation_date {
                return Err(DomainError::validation(
                    "valid_until cannot precede the quotation date",
                ));
            }
        }

        let (items, subtotal) = price_items(&self.items)?;
        let tax = glassbill_tax::compute(&TaxInput {
            billing_type: self.billing_type,
            subtotal,
            charges: self.charges,
            tax_percentage: self.tax_percentage,
            supplier_state: supplier_state.map(str::to_string),
            customer_state: self.customer.state.clone(),
        })?;

        Ok(Pricing {
            items,
            subtotal,
            tax,
        })
    }
}

/// Aggregate root: Quotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quotation {
    id: QuotationId,
    tenant_id: Option<TenantId>,
    number: Option<DocumentNumber>,
    customer: Option<CustomerSnapshot>,
    billing_type: BillingType,
    quotation_date: Option<NaiveDate>,
    valid_until: Option<NaiveDate>,
    items: Vec<QuotationItem>,
    subtotal: Money,
    charges: Charges,
    tax: Option<TaxBreakdown>,
    status: QuotationStatus,
    created_by: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    confirmed_by: Option<String>,
    confirmed_at: Option<DateTime<Utc>>,
    rejected_by: Option<String>,
    rejected_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    deleted: bool,
    version: u64,
    created: bool,
}

impl Quotation {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: QuotationId) -> Self {
        Self {
            id,
            tenant_id: None,
            number: None,
            customer: None,
            billing_type: BillingType::Gst,
            quotation_date: None,
            valid_until: None,
            items: Vec::new(),
            subtotal: Money::zero(),
            charges: Charges::default(),
            tax: None,
            status: QuotationStatus::Draft,
            created_by: None,
            created_at: None,
            updated_at: None,
            confirmed_by: None,
            confirmed_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            deleted: false,
            version: 0,
            created: false,
        }
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn number(&self) -> Option<&DocumentNumber> {
        self.number.as_ref()
    }

    pub fn customer(&self) -> Option<&CustomerSnapshot> {
        self.customer.as_ref()
    }

    pub fn billing_type(&self) -> BillingType {
        self.billing_type
    }

    pub fn quotation_date(&self) -> Option<NaiveDate> {
        self.quotation_date
    }

    pub fn valid_until(&self) -> Option<NaiveDate> {
        self.valid_until
    }

    pub fn items(&self) -> &[QuotationItem] {
        &self.items
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

    pub fn status(&self) -> QuotationStatus {
        self.status
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

    pub fn confirmed_by(&self) -> Option<&str> {
        self.confirmed_by.as_deref()
    }

    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at
    }

    pub fn rejected_by(&self) -> Option<&str> {
        self.rejected_by.as_deref()
    }

    pub fn rejected_at(&self) -> Option<DateTime<Utc>> {
        self.rejected_at
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    /// Only drafts may change status or be deleted.
    pub fn is_modifiable(&self) -> bool {
        matches!(self.status, QuotationStatus::Draft)
    }
}

impl AggregateRoot for Quotation {
    type Id = QuotationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl TenantOwned for Quotation {
    fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }
}

/// Command: CreateQuotation. The number is allocated by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateQuotation {
    pub tenant_id: TenantId,
    pub quotation_id: QuotationId,
    pub number: DocumentNumber,
    pub draft: QuotationDraft,
    pub supplier_state: Option<String>,
    pub created_by: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmQuotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmQuotation {
    pub tenant_id: TenantId,
    pub quotation_id: QuotationId,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectQuotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectQuotation {
    pub tenant_id: TenantId,
    pub quotation_id: QuotationId,
    pub actor: String,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteQuotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteQuotation {
    pub tenant_id: TenantId,
    pub quotation_id: QuotationId,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuotationCommand {
    CreateQuotation(CreateQuotation),
    ConfirmQuotation(ConfirmQuotation),
    RejectQuotation(RejectQuotation),
    DeleteQuotation(DeleteQuotation),
}

/// Event: QuotationCreated. Carries the computed figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationCreated {
    pub tenant_id: TenantId,
    pub quotation_id: QuotationId,
    pub number: DocumentNumber,
    pub customer: CustomerSnapshot,
    pub billing_type: BillingType,
    pub quotation_date: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub items: Vec<QuotationItem>,
    pub subtotal: Money,
    pub charges: Charges,
    pub tax: TaxBreakdown,
    pub created_by: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuotationConfirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationConfirmed {
    pub tenant_id: TenantId,
    pub quotation_id: QuotationId,
    pub number: DocumentNumber,
    pub confirmed_by: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuotationRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationRejected {
    pub tenant_id: TenantId,
    pub quotation_id: QuotationId,
    pub number: DocumentNumber,
    pub rejected_by: String,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuotationDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationDeleted {
    pub tenant_id: TenantId,
    pub quotation_id: QuotationId,
    pub number: DocumentNumber,
    pub deleted_by: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuotationEvent {
    QuotationCreated(QuotationCreated),
    QuotationConfirmed(QuotationConfirmed),
    QuotationRejected(QuotationRejected),
    QuotationDeleted(QuotationDeleted),
}

impl Event for QuotationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            QuotationEvent::QuotationCreated(_) => "billing.quotation.created",
            QuotationEvent::QuotationConfirmed(_) => "billing.quotation.confirmed",
            QuotationEvent::QuotationRejected(_) => "billing.quotation.rejected",
            QuotationEvent::QuotationDeleted(_) => "billing.quotation.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            QuotationEvent::QuotationCreated(e) => e.occurred_at,
            QuotationEvent::QuotationConfirmed(e) => e.occurred_at,
            QuotationEvent::QuotationRejected(e) => e.occurred_at,
            QuotationEvent::QuotationDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Quotation {
    type Command = QuotationCommand;
    type Event = QuotationEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            QuotationEvent::QuotationCreated(e) => {
                self.id = e.quotation_id;
                self.tenant_id = Some(e.tenant_id);
                self.number = Some(e.number.clone());
                self.customer = Some(e.customer.clone());
                self.billing_type = e.billing_type;
                self.quotation_date = Some(e.quotation_date);
                self.valid_until = e.valid_until;
                self.items = e.items.clone();
                self.subtotal = e.subtotal;
                self.charges = e.charges;
                self.tax = Some(e.tax);
                self.status = QuotationStatus::Draft;
                self.created_by = Some(e.created_by.clone());
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.created = true;
            }
            QuotationEvent::QuotationConfirmed(e) => {
                self.status = QuotationStatus::Confirmed;
                self.confirmed_by = Some(e.confirmed_by.clone());
                self.confirmed_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
            }
            QuotationEvent::QuotationRejected(e) => {
                self.status = QuotationStatus::Rejected;
                self.rejected_by = Some(e.rejected_by.clone());
                self.rejected_at = Some(e.occurred_at);
                self.rejection_reason = Some(e.reason.clone());
                self.updated_at = Some(e.occurred_at);
            }
            QuotationEvent::QuotationDeleted(e) => {
                self.deleted = true;
                self.updated_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            QuotationCommand::CreateQuotation(cmd) => self.handle_create(cmd),
            QuotationCommand::ConfirmQuotation(cmd) => self.handle_confirm(cmd),
            QuotationCommand::RejectQuotation(cmd) => self.handle_reject(cmd),
            QuotationCommand::DeleteQuotation(cmd) => self.handle_delete(cmd),
        }
    }
}

impl Quotation {
    /// Existence, ownership and DRAFT status, checked in that order.
    fn ensure_draft_of(
        &self,
        tenant_id: TenantId,
        quotation_id: QuotationId,
        action: &str,
    ) -> DomainResult<DocumentNumber> {
        let number = match &self.number {
            Some(number) if self.created && !self.deleted && self.id == quotation_id => number,
            _ => return Err(DomainError::not_found()),
        };
        self.ensure_owned_by(tenant_id)?;

        if !self.is_modifiable() {
            return Err(DomainError::invalid_state(format!(
                "cannot {action} quotation {number} in status {:?}",
                self.status
            )));
        }
        Ok(number.clone())
    }

    fn handle_create(&self, cmd: &CreateQuotation) -> DomainResult<Vec<QuotationEvent>> {
        if self.created {
            return Err(DomainError::conflict("quotation already exists"));
        }
        if cmd.number.kind() != Some(DocumentKind::Quotation) {
            return Err(DomainError::validation(format!(
                "{} is not a quotation number",
                cmd.number
            )));
        }
        if cmd.created_by.trim().is_empty() {
            return Err(DomainError::validation("created_by cannot be empty"));
        }

        let Pricing {
            items,
            subtotal,
            tax,
        } = cmd.draft.price(cmd.supplier_state.as_deref())?;

        Ok(vec![QuotationEvent::QuotationCreated(QuotationCreated {
            tenant_id: cmd.tenant_id,
            quotation_id: cmd.quotation_id,
            number: cmd.number.clone(),
            customer: cmd.draft.customer.clone(),
            billing_type: cmd.draft.billing_type,
            quotation_date: cmd.draft.quotation_date,
            valid_until: cmd.draft.valid_until,
            items,
            subtotal,
            charges: cmd.draft.charges,
            tax,
            created_by: cmd.created_by.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_confirm(&self, cmd: &ConfirmQuotation) -> DomainResult<Vec<QuotationEvent>> {
        let number = self.ensure_draft_of(cmd.tenant_id, cmd.quotation_id, "confirm")?;

        Ok(vec![QuotationEvent::QuotationConfirmed(QuotationConfirmed {
            tenant_id: cmd.tenant_id,
            quotation_id: cmd.quotation_id,
            number,
            confirmed_by: cmd.actor.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectQuotation) -> DomainResult<Vec<QuotationEvent>> {
        let number = self.ensure_draft_of(cmd.tenant_id, cmd.quotation_id, "reject")?;

        let reason = cmd.reason.trim();
        if reason.is_empty() {
            return Err(DomainError::validation("a rejection reason is required"));
        }

        Ok(vec![QuotationEvent::QuotationRejected(QuotationRejected {
            tenant_id: cmd.tenant_id,
            quotation_id: cmd.quotation_id,
            number,
            rejected_by: cmd.actor.clone(),
            reason: reason.to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteQuotation) -> DomainResult<Vec<QuotationEvent>> {
        let number = self.ensure_draft_of(cmd.tenant_id, cmd.quotation_id, "delete")?;

        Ok(vec![QuotationEvent::QuotationDeleted(QuotationDeleted {
            tenant_id: cmd.tenant_id,
            quotation_id: cmd.quotation_id,
            number,
            deleted_by: cmd.actor.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
