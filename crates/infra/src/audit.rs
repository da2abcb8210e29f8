//! Audit trail: every committed billing write is published as one envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use glassbill_events::{Event, EventEnvelope};
use glassbill_invoicing::InvoiceEvent;
use glassbill_parties::CustomerEvent;
use glassbill_quotations::QuotationEvent;

pub const CUSTOMER_AGGREGATE: &str = "billing.customer";
pub const QUOTATION_AGGREGATE: &str = "billing.quotation";
pub const INVOICE_AGGREGATE: &str = "billing.invoice";

/// Union of the billing aggregates' events, as carried on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "aggregate", content = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingEvent {
    Customer(CustomerEvent),
    Quotation(QuotationEvent),
    Invoice(InvoiceEvent),
}

pub type BillingEnvelope = EventEnvelope<BillingEvent>;

impl Event for BillingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BillingEvent::Customer(e) => e.event_type(),
            BillingEvent::Quotation(e) => e.event_type(),
            BillingEvent::Invoice(e) => e.event_type(),
        }
    }

    fn version(&self) -> u32 {
        match self {
            BillingEvent::Customer(e) => e.version(),
            BillingEvent::Quotation(e) => e.version(),
            BillingEvent::Invoice(e) => e.version(),
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            BillingEvent::Customer(e) => e.occurred_at(),
            BillingEvent::Quotation(e) => e.occurred_at(),
            BillingEvent::Invoice(e) => e.occurred_at(),
        }
    }
}

impl From<CustomerEvent> for BillingEvent {
    fn from(value: CustomerEvent) -> Self {
        BillingEvent::Customer(value)
    }
}

impl From<QuotationEvent> for BillingEvent {
    fn from(value: QuotationEvent) -> Self {
        BillingEvent::Quotation(value)
    }
}

impl From<InvoiceEvent> for BillingEvent {
    fn from(value: InvoiceEvent) -> Self {
        BillingEvent::Invoice(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use glassbill_core::{DocumentNumber, QuotationId, TenantId};
    use glassbill_quotations::QuotationConfirmed;

    #[test]
    fn envelope_takes_type_and_time_from_the_inner_event() {
        let tenant_id = TenantId::new();
        let quotation_id = QuotationId::new();
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let event = BillingEvent::from(QuotationEvent::QuotationConfirmed(QuotationConfirmed {
            tenant_id,
            quotation_id,
            number: DocumentNumber::parse("QTN-2024-01-0001").unwrap(),
            confirmed_by: "asha".to_string(),
            occurred_at: at,
        }));

        let envelope = BillingEnvelope::wrap(tenant_id, quotation_id, QUOTATION_AGGREGATE, 2, event);
        assert_eq!(envelope.event_type(), "billing.quotation.confirmed");
        assert_eq!(envelope.occurred_at(), at);
        assert_eq!(envelope.aggregate_id(), *quotation_id.as_uuid());

        let json = serde_json::to_value(envelope.payload()).unwrap();
        assert_eq!(json["aggregate"], "QUOTATION");
    }
}
