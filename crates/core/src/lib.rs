//! `glassbill-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the billing
//! crates: identifiers, the error taxonomy, fixed-point money and the document
//! number format. No infrastructure concerns.

pub mod aggregate;
pub mod document;
pub mod error;
pub mod id;
pub mod money;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion, TenantOwned};
pub use document::{DocumentKind, DocumentNumber, NumberingPeriod};
pub use error::{DomainError, DomainResult};
pub use id::{CustomerId, InvoiceId, PaymentId, QuotationId, TenantId, UserId};
pub use money::{Money, round_half_up};
