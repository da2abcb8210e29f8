//! Fixed-point monetary amounts.
//!
//! All money in the billing engine is a `rust_decimal::Decimal`; binary floating
//! point never touches an amount. Values keep full precision while they are
//! being combined and are rounded to two places, half-up, once at the end of a
//! computation via [`Money::rounded`].
//!
//! Arithmetic is checked: every combining operation returns `None` on
//! overflow instead of panicking, and callers turn that into a domain error.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of fractional digits carried by stored monetary amounts.
pub const MONEY_SCALE: u32 = 2;

/// Round a decimal to [`MONEY_SCALE`] places using round-half-up.
///
/// Half-up here means ties move away from zero (`0.005 -> 0.01`,
/// `-0.005 -> -0.01`), the convention used on printed tax invoices.
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// A monetary amount in the shop's currency.
///
/// Signed: a due amount can go negative on overpayment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// This amount rounded to two places, half-up.
    pub fn rounded(&self) -> Money {
        Money(round_half_up(self.0))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Multiply by a decimal factor (rate, quantity, area). Not rounded.
    pub fn checked_times(self, factor: Decimal) -> Option<Money> {
        self.0.checked_mul(factor).map(Money)
    }

    /// `percent` of this amount (`self * percent / 100`). Not rounded.
    pub fn checked_percent(self, percent: Decimal) -> Option<Money> {
        self.0
            .checked_mul(percent)
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .map(Money)
    }

    /// Sum of `amounts`, or `None` if any partial sum overflows.
    pub fn checked_sum<I>(amounts: I) -> Option<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }

    /// Split into two halves that sum back exactly to the rounded amount.
    ///
    /// The first half is rounded half-up and the second takes the remainder,
    /// so an odd paisa lands on the first half.
    pub fn split_in_half(&self) -> (Money, Money) {
        let total = round_half_up(self.0);
        let first = round_half_up(total / Decimal::TWO);
        (Money(first), Money(total - first))
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.2}", round_half_up(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounding_is_half_up_at_two_places() {
        assert_eq!(round_half_up(dec!(10.005)), dec!(10.01));
        assert_eq!(round_half_up(dec!(10.004)), dec!(10.00));
        assert_eq!(round_half_up(dec!(-10.005)), dec!(-10.01));
        assert_eq!(round_half_up(dec!(2.675)), dec!(2.68));
    }

    #[test]
    fn decimal_sums_do_not_drift() {
        let total = Money::checked_sum((0..10).map(|_| Money::new(dec!(0.1)))).unwrap();
        assert_eq!(total, Money::new(dec!(1.0)));
    }

    #[test]
    fn percent_of_taxable_base() {
        let base = Money::new(dec!(1100));
        assert_eq!(base.checked_percent(dec!(18)).unwrap().rounded(), Money::new(dec!(198)));
    }

    #[test]
    fn split_in_half_preserves_the_total() {
        let (a, b) = Money::new(dec!(198)).split_in_half();
        assert_eq!(a, Money::new(dec!(99)));
        assert_eq!(b, Money::new(dec!(99)));

        let (a, b) = Money::new(dec!(10.01)).split_in_half();
        assert_eq!(a.amount() + b.amount(), dec!(10.01));
        assert_eq!(a, Money::new(dec!(5.01)));
        assert_eq!(b, Money::new(dec!(5.00)));
    }

    #[test]
    fn overflow_is_reported_not_panicked() {
        let max = Money::new(Decimal::MAX);
        assert_eq!(max.checked_add(Money::new(dec!(1))), None);
        assert_eq!(Money::new(Decimal::MIN).checked_sub(Money::new(dec!(1))), None);
        assert_eq!(max.checked_times(dec!(2)), None);
        assert_eq!(max.checked_percent(dec!(200)), None);
        assert_eq!(Money::checked_sum([max, max]), None);
    }

    #[test]
    fn display_always_shows_two_places() {
        assert_eq!(Money::new(dec!(1298)).to_string(), "1298.00");
        assert_eq!(Money::new(dec!(-0.5)).to_string(), "-0.50");
    }

    #[test]
    fn serializes_as_a_decimal_string() {
        let json = serde_json::to_string(&Money::new(dec!(798.50))).unwrap();
        assert_eq!(json, "\"798.50\"");
    }
}
