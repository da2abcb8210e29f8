//! Line items and area pricing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use glassbill_core::{DomainError, DomainResult, Money, round_half_up};

/// Unit a glass dimension is measured in. Areas are priced per square foot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DimensionUnit {
    #[default]
    Feet,
    Inch,
    Mm,
}

impl DimensionUnit {
    /// Convert `value` in this unit to feet, at full precision.
    pub fn to_feet(self, value: Decimal) -> Decimal {
        match self {
            DimensionUnit::Feet => value,
            DimensionUnit::Inch => value / Decimal::from(12),
            DimensionUnit::Mm => value / Decimal::new(3048, 1),
        }
    }
}

/// A line item as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationItemInput {
    pub glass_type: String,
    pub thickness: Option<String>,
    pub design: Option<String>,
    pub description: Option<String>,
    pub height: Decimal,
    #[serde(default)]
    pub height_unit: DimensionUnit,
    pub width: Decimal,
    #[serde(default)]
    pub width_unit: DimensionUnit,
    pub quantity: u32,
    /// Price per square foot.
    pub rate_per_sq_ft: Decimal,
    /// HSN tax-classification code.
    pub hsn_code: Option<String>,
}

/// A priced line item. `item_order` is dense and zero-based within its
/// document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationItem {
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
    /// Square feet of one piece, unrounded.
    pub area_sq_ft: Decimal,
    /// `area_sq_ft * rate_per_sq_ft * quantity`, unrounded.
    pub subtotal: Decimal,
    pub hsn_code: Option<String>,
}

impl QuotationItemInput {
    fn price(&self, item_order: u32) -> DomainResult<QuotationItem> {
        let line = item_order + 1;
        if self.glass_type.trim().is_empty() {
            return Err(DomainError::validation(format!("item {line}: glass type is required")));
        }
        if self.quantity == 0 {
            return Err(DomainError::validation(format!("item {line}: quantity must be positive")));
        }
        if self.height <= Decimal::ZERO || self.width <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "item {line}: dimensions must be positive"
            )));
        }
        if self.rate_per_sq_ft < Decimal::ZERO {
            return Err(DomainError::validation(format!("item {line}: rate cannot be negative")));
        }

        let too_large = || DomainError::validation(format!("item {line}: amount is too large"));
        let area_sq_ft = self
            .height_unit
            .to_feet(self.height)
            .checked_mul(self.width_unit.to_feet(self.width))
            .ok_or_else(too_large)?;
        let subtotal = area_sq_ft
            .checked_mul(self.rate_per_sq_ft)
            .and_then(|v| v.checked_mul(Decimal::from(self.quantity)))
            .ok_or_else(too_large)?;

        Ok(QuotationItem {
            item_order,
            glass_type: self.glass_type.trim().to_string(),
            thickness: self.thickness.clone(),
            design: self.design.clone(),
            description: self.description.clone(),
            height: self.height,
            height_unit: self.height_unit,
            width: self.width,
            width_unit: self.width_unit,
            quantity: self.quantity,
            rate_per_sq_ft: self.rate_per_sq_ft,
            area_sq_ft,
            subtotal,
            hsn_code: self.hsn_code.clone(),
        })
    }
}

/// Price every item and return them with the document subtotal.
///
/// The subtotal is the unrounded sum of item subtotals, rounded once.
pub fn price_items(inputs: &[QuotationItemInput]) -> DomainResult<(Vec<QuotationItem>, Money)> {
    if inputs.is_empty() {
        return Err(DomainError::validation("a quotation needs at least one item"));
    }

    let items = inputs
        .iter()
        .enumerate()
        .map(|(idx, input)| input.price(idx as u32))
        .collect::<DomainResult<Vec<_>>>()?;

    let sum = items
        .iter()
        .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.subtotal))
        .ok_or_else(|| DomainError::validation("quotation subtotal is too large"))?;
    Ok((items, Money::new(round_half_up(sum))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn item(height: Decimal, unit: DimensionUnit, width: Decimal, qty: u32, rate: Decimal) -> QuotationItemInput {
        QuotationItemInput {
            glass_type: "Clear Float".to_string(),
            thickness: Some("5mm".to_string()),
            design: None,
            description: None,
            height,
            height_unit: unit,
            width,
            width_unit: unit,
            quantity: qty,
            rate_per_sq_ft: rate,
            hsn_code: Some("7005".to_string()),
        }
    }

    #[test]
    fn converts_units_to_square_feet() {
        assert_eq!(DimensionUnit::Inch.to_feet(dec!(24)), dec!(2));
        assert_eq!(DimensionUnit::Mm.to_feet(dec!(609.6)), dec!(2));
        assert_eq!(DimensionUnit::Feet.to_feet(dec!(3.5)), dec!(3.5));
    }

    #[test]
    fn prices_items_in_order() {
        let (items, subtotal) = price_items(&[
            item(dec!(4), DimensionUnit::Feet, dec!(5), 2, dec!(50)),
            item(dec!(36), DimensionUnit::Inch, dec!(24), 1, dec!(100)),
        ])
        .unwrap();

        assert_eq!(items[0].item_order, 0);
        assert_eq!(items[0].area_sq_ft, dec!(20));
        assert_eq!(items[0].subtotal, dec!(2000));
        assert_eq!(items[1].item_order, 1);
        assert_eq!(items[1].area_sq_ft, dec!(6));
        assert_eq!(items[1].subtotal, dec!(600));
        assert_eq!(subtotal, Money::new(dec!(2600)));
    }

    #[test]
    fn subtotal_is_rounded_once_after_summing() {
        // 1 ft x 1 in = 1/12 sq ft; per-item rounding would give 0.08 * 3 = 0.24.
        let mut sliver = item(dec!(1), DimensionUnit::Feet, dec!(1), 1, dec!(1));
        sliver.width_unit = DimensionUnit::Inch;
        let (items, subtotal) = price_items(&[sliver.clone(), sliver.clone(), sliver]).unwrap();

        assert!(items.iter().all(|i| i.subtotal.scale() > 2));
        assert_eq!(subtotal, Money::new(dec!(0.25)));
    }

    #[test]
    fn rejects_empty_and_invalid_items() {
        assert!(matches!(price_items(&[]), Err(DomainError::Validation(_))));

        let zero_qty = item(dec!(1), DimensionUnit::Feet, dec!(1), 0, dec!(10));
        match price_items(&[zero_qty]).unwrap_err() {
            DomainError::Validation(msg) if msg.contains("quantity") => {}
            other => panic!("Expected quantity validation, got {other:?}"),
        }

        let flat = item(dec!(0), DimensionUnit::Feet, dec!(1), 1, dec!(10));
        match price_items(&[flat]).unwrap_err() {
            DomainError::Validation(msg) if msg.contains("dimensions") => {}
            other => panic!("Expected dimension validation, got {other:?}"),
        }

        let negative_rate = item(dec!(1), DimensionUnit::Feet, dec!(1), 1, dec!(-1));
        assert!(matches!(price_items(&[negative_rate]), Err(DomainError::Validation(_))));
    }

    #[test]
    fn oversized_amounts_are_rejected_instead_of_overflowing() {
        let side = Decimal::from(10u64.pow(17));
        let huge = item(side, DimensionUnit::Feet, side, 1, dec!(1));
        match price_items(&[huge]).unwrap_err() {
            DomainError::Validation(msg) if msg.contains("too large") => {}
            other => panic!("Expected size validation, got {other:?}"),
        }

        // Each line fits on its own; their sum does not.
        let side = Decimal::from(10u64.pow(14));
        let big = item(side, DimensionUnit::Feet, side, 1, dec!(5));
        match price_items(&[big.clone(), big]).unwrap_err() {
            DomainError::Validation(msg) if msg.contains("subtotal") => {}
            other => panic!("Expected subtotal validation, got {other:?}"),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Item order is dense and zero-based; subtotal is the rounded sum.
        #[test]
        fn item_order_is_dense_and_subtotal_is_rounded_sum(
            dims in prop::collection::vec((1i64..5_000, 1i64..5_000, 1u32..20, 0i64..50_000), 1..12)
        ) {
            let inputs: Vec<_> = dims
                .iter()
                .map(|(h, w, q, r)| item(Decimal::new(*h, 0), DimensionUnit::Mm, Decimal::new(*w, 0), *q, Decimal::new(*r, 2)))
                .collect();

            let (items, subtotal) = price_items(&inputs).unwrap();

            prop_assert_eq!(items.len(), inputs.len());
            for (idx, it) in items.iter().enumerate() {
                prop_assert_eq!(it.item_order, idx as u32);
            }
            let sum: Decimal = items.iter().map(|i| i.subtotal).sum();
            prop_assert_eq!(subtotal.amount(), round_half_up(sum));
        }
    }
}
