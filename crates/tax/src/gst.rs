use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use glassbill_core::{DomainError, DomainResult, Money};

/// Whether a document is billed with GST at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingType {
    Gst,
    NonGst,
}

/// Intra-state (CGST + SGST) or inter-state (IGST) supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupplyKind {
    IntraState,
    InterState,
}

/// Document-level charges applied on top of the item subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Charges {
    pub installation_charge: Money,
    pub transport_charge: Money,
    pub discount: Money,
}

/// Everything the tax computation needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxInput {
    pub billing_type: BillingType,
    pub subtotal: Money,
    pub charges: Charges,
    /// Required for [`BillingType::Gst`]; ignored for [`BillingType::NonGst`].
    pub tax_percentage: Option<Decimal>,
    pub supplier_state: Option<String>,
    pub customer_state: Option<String>,
}

/// Result of a tax computation. Every amount is rounded to two places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub taxable_base: Money,
    pub tax_percentage: Option<Decimal>,
    pub supply: SupplyKind,
    pub cgst: Money,
    pub sgst: Money,
    pub igst: Money,
    pub tax_amount: Money,
    pub grand_total: Money,
}

/// Pick intra- or inter-state supply by comparing registered states.
///
/// States compare case-insensitively, ignoring surrounding whitespace. When
/// either side has no state on record the supply is treated as intra-state.
pub fn supply_kind(supplier_state: Option<&str>, customer_state: Option<&str>) -> SupplyKind {
    let normalize = |s: &str| s.trim().to_lowercase();
    match (supplier_state, customer_state) {
        (Some(supplier), Some(customer))
            if !supplier.trim().is_empty()
                && !customer.trim().is_empty()
                && normalize(supplier) != normalize(customer) =>
        {
            SupplyKind::InterState
        }
        _ => SupplyKind::IntraState,
    }
}

/// Compute the tax split and grand total.
///
/// `taxable_base = subtotal + installation + transport - discount`,
/// `tax_amount = taxable_base * rate / 100`, `grand_total = taxable_base + tax_amount`.
/// Rounding (half-up, two places) happens once, on the final figures; the
/// tax and grand total are taken from the unrounded base. An amount that
/// overflows the decimal range is rejected with `InvalidAmount`.
pub fn compute(input: &TaxInput) -> DomainResult<TaxBreakdown> {
    let Charges {
        installation_charge,
        transport_charge,
        discount,
    } = input.charges;

    if input.subtotal.is_negative() {
        return Err(DomainError::validation("subtotal cannot be negative"));
    }
    if installation_charge.is_negative() || transport_charge.is_negative() {
        return Err(DomainError::validation("charges cannot be negative"));
    }

    let gross = Money::checked_sum([input.subtotal, installation_charge, transport_charge])
        .ok_or_else(|| overflow("subtotal plus charges"))?;
    if discount.is_negative() {
        return Err(DomainError::invalid_discount(format!(
            "discount {discount} is negative"
        )));
    }
    if discount > gross {
        return Err(DomainError::invalid_discount(format!(
            "discount {discount} exceeds subtotal plus charges {gross}"
        )));
    }

    let tax_percentage = match input.billing_type {
        BillingType::Gst => {
            let rate = input
                .tax_percentage
                .ok_or_else(|| DomainError::invalid_tax_rate("GST billing requires a tax percentage"))?;
            if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
                return Err(DomainError::invalid_tax_rate(format!(
                    "{rate} is outside [0, 100]"
                )));
            }
            Some(rate)
        }
        BillingType::NonGst => None,
    };

    // Full precision until the final figures.
    let base = gross
        .checked_sub(discount)
        .ok_or_else(|| overflow("taxable base"))?;
    let tax = match tax_percentage {
        Some(rate) => base
            .checked_percent(rate)
            .ok_or_else(|| overflow("tax amount"))?,
        None => Money::zero(),
    };
    let grand_total = base
        .checked_add(tax)
        .ok_or_else(|| overflow("grand total"))?
        .rounded();
    let taxable_base = base.rounded();
    let tax_amount = tax.rounded();

    let supply = supply_kind(input.supplier_state.as_deref(), input.customer_state.as_deref());
    let (cgst, sgst, igst) = match supply {
        SupplyKind::IntraState => {
            let (cgst, sgst) = tax_amount.split_in_half();
            (cgst, sgst, Money::zero())
        }
        SupplyKind::InterState => (Money::zero(), Money::zero(), tax_amount),
    };

    Ok(TaxBreakdown {
        taxable_base,
        tax_percentage,
        supply,
        cgst,
        sgst,
        igst,
        tax_amount,
        grand_total,
    })
}

fn overflow(what: &str) -> DomainError {
    DomainError::invalid_amount(format!("{what} is too large"))
}
