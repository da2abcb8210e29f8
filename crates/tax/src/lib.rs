//! GST computation (pure, deterministic).
//!
//! Derives the CGST/SGST vs. IGST split and the grand total of a document from
//! its subtotal, charges and discount. Same-state supply splits the tax evenly
//! into CGST and SGST; cross-state supply puts all of it on IGST.

pub mod gst;

pub use gst::{BillingType, Charges, SupplyKind, TaxBreakdown, TaxInput, compute, supply_kind};
