//! Quotations domain module (event-sourced).
//!
//! A quotation is a priced proposal for cut glass. It starts as a DRAFT and is
//! either CONFIRMED or REJECTED exactly once; after that it is a legal record
//! and never changes. Pure domain logic (no IO, no HTTP, no storage).

pub mod item;
pub mod quotation;

pub use item::{DimensionUnit, QuotationItem, QuotationItemInput, price_items};
pub use quotation::{
    ConfirmQuotation, CreateQuotation, DeleteQuotation, Pricing, Quotation, QuotationCommand,
    QuotationConfirmed, QuotationCreated, QuotationDeleted, QuotationDraft, QuotationEvent,
    QuotationRejected, QuotationStatus, RejectQuotation,
};
