//! Invoicing domain module (event-sourced).
//!
//! An invoice is materialized from exactly one CONFIRMED quotation and freezes
//! its customer snapshot, figures and items. After that only payments are
//! appended, and paid/due/status are recomputed from them after every append.
//! Pure domain logic (no IO, no HTTP, no storage).

pub mod invoice;
pub mod payment;

pub use invoice::{
    Invoice, InvoiceCommand, InvoiceEvent, InvoiceItem, InvoiceMaterialized, InvoiceType,
    MaterializeInvoice, PaymentRecorded, RecordPayment, SourceQuotation,
};
pub use payment::{Payment, PaymentMetadata, PaymentMode, PaymentStatus, Settlement};
