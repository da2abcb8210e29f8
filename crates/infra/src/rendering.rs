//! Document rendering boundary.
//!
//! Renderers receive stored records as-is and never recompute figures. The
//! production renderer (PDF) lives outside this workspace; [`PlainTextRenderer`]
//! is a byte-stream renderer used by the demo binary and tests.

use std::fmt::{self, Write as _};

use thiserror::Error;

use glassbill_invoicing::Invoice;
use glassbill_quotations::Quotation;
use glassbill_tax::{BillingType, TaxBreakdown};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The record is missing fields every rendered document needs.
    #[error("document is incomplete: {0}")]
    Incomplete(String),

    #[error("rendering failed: {0}")]
    Failed(String),
}

/// Turns a finalized quotation or invoice into a byte stream.
pub trait DocumentRenderer: Send + Sync {
    fn render_quotation(&self, quotation: &Quotation) -> Result<Vec<u8>, RenderError>;

    fn render_invoice(&self, invoice: &Invoice) -> Result<Vec<u8>, RenderError>;
}

impl<R> DocumentRenderer for std::sync::Arc<R>
where
    R: DocumentRenderer + ?Sized,
{
    fn render_quotation(&self, quotation: &Quotation) -> Result<Vec<u8>, RenderError> {
        (**self).render_quotation(quotation)
    }

    fn render_invoice(&self, invoice: &Invoice) -> Result<Vec<u8>, RenderError> {
        (**self).render_invoice(invoice)
    }
}

/// UTF-8 text layout of the legal fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextRenderer;

fn write_tax(out: &mut String, billing_type: BillingType, tax: &TaxBreakdown) -> fmt::Result {
    writeln!(out, "Taxable value: {}", tax.taxable_base)?;
    if billing_type == BillingType::Gst {
        if let Some(rate) = tax.tax_percentage {
            writeln!(out, "GST rate: {rate}%")?;
        }
        writeln!(out, "CGST: {}", tax.cgst)?;
        writeln!(out, "SGST: {}", tax.sgst)?;
        writeln!(out, "IGST: {}", tax.igst)?;
    }
    writeln!(out, "Grand total: {}", tax.grand_total)
}

fn quotation_text(quotation: &Quotation, out: &mut String) -> Result<(), RenderError> {
    let number = quotation
        .number()
        .ok_or_else(|| RenderError::Incomplete("quotation number".to_string()))?;
    let customer = quotation
        .customer()
        .ok_or_else(|| RenderError::Incomplete("customer".to_string()))?;
    let tax = quotation
        .tax()
        .ok_or_else(|| RenderError::Incomplete("tax breakdown".to_string()))?;

    writeln!(out, "QUOTATION {number} [{:?}]", quotation.status())?;
    if let Some(date) = quotation.quotation_date() {
        writeln!(out, "Date: {date}")?;
    }
    if let Some(valid_until) = quotation.valid_until() {
        writeln!(out, "Valid until: {valid_until}")?;
    }
    writeln!(out, "Customer: {}", customer.name)?;
    for item in quotation.items() {
        writeln!(
            out,
            "{:>3}. {} {} sq.ft x {} @ {} = {}",
            item.item_order,
            item.glass_type,
            item.area_sq_ft.round_dp(2),
            item.quantity,
            item.rate_per_sq_ft,
            item.subtotal.round_dp(2)
        )?;
    }
    writeln!(out, "Subtotal: {}", quotation.subtotal())?;
    write_tax(out, quotation.billing_type(), tax)?;
    Ok(())
}

fn invoice_text(invoice: &Invoice, out: &mut String) -> Result<(), RenderError> {
    let number = invoice
        .number()
        .ok_or_else(|| RenderError::Incomplete("invoice number".to_string()))?;
    let customer = invoice
        .customer()
        .ok_or_else(|| RenderError::Incomplete("customer".to_string()))?;
    let tax = invoice
        .tax()
        .ok_or_else(|| RenderError::Incomplete("tax breakdown".to_string()))?;

    writeln!(out, "TAX INVOICE {number} ({:?})", invoice.invoice_type())?;
    if let Some(date) = invoice.invoice_date() {
        writeln!(out, "Date: {date}")?;
    }
    if let Some(quotation_number) = invoice.quotation_number() {
        writeln!(out, "Against quotation: {quotation_number}")?;
    }
    writeln!(out, "Customer: {}", customer.name)?;
    if let Some(gstin) = &customer.gstin {
        writeln!(out, "GSTIN: {gstin}")?;
    }
    for item in invoice.items() {
        writeln!(
            out,
            "{:>3}. {} {} sq.ft x {} = {}",
            item.item_order,
            item.glass_type,
            item.area_sq_ft.round_dp(2),
            item.quantity,
            item.subtotal.round_dp(2)
        )?;
    }
    writeln!(out, "Subtotal: {}", invoice.subtotal())?;
    write_tax(out, invoice.billing_type(), tax)?;
    writeln!(out, "Paid: {}", invoice.paid_amount())?;
    writeln!(out, "Due: {}", invoice.due_amount())?;
    writeln!(out, "Status: {:?}", invoice.payment_status())?;
    Ok(())
}

impl From<fmt::Error> for RenderError {
    fn from(e: fmt::Error) -> Self {
        RenderError::Failed(e.to_string())
    }
}

impl DocumentRenderer for PlainTextRenderer {
    fn render_quotation(&self, quotation: &Quotation) -> Result<Vec<u8>, RenderError> {
        let mut out = String::new();
        quotation_text(quotation, &mut out)?;
        Ok(out.into_bytes())
    }

    fn render_invoice(&self, invoice: &Invoice) -> Result<Vec<u8>, RenderError> {
        let mut out = String::new();
        invoice_text(invoice, &mut out)?;
        Ok(out.into_bytes())
    }
}
