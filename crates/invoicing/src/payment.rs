//! Payments and the derived payment status.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use glassbill_core::{DomainError, DomainResult, Money, PaymentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMode {
    Cash,
    Upi,
    Card,
    BankTransfer,
    Cheque,
}

/// Derived from paid amount vs. grand total; never set directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Due,
    Partial,
    Paid,
}

impl PaymentStatus {
    /// `paid >= grand` is PAID, otherwise any positive payment is PARTIAL,
    /// otherwise DUE. Evaluated in that order.
    pub fn derive(paid_amount: Money, grand_total: Money) -> Self {
        if paid_amount >= grand_total {
            PaymentStatus::Paid
        } else if paid_amount.is_positive() {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Due
        }
    }
}

/// Optional bank/cheque/UPI details recorded with a payment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaymentMetadata {
    pub reference_number: Option<String>,
    pub bank_name: Option<String>,
    pub cheque_number: Option<String>,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
}

/// An immutable payment row owned by one invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: PaymentId,
    pub mode: PaymentMode,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub metadata: PaymentMetadata,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Paid/due/status triple, always recomputed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub paid_amount: Money,
    /// Negative when the invoice is overpaid.
    pub due_amount: Money,
    pub payment_status: PaymentStatus,
}

impl Settlement {
    /// Nothing paid yet.
    pub fn unpaid(grand_total: Money) -> Self {
        Self {
            paid_amount: Money::zero(),
            due_amount: grand_total,
            payment_status: PaymentStatus::derive(Money::zero(), grand_total),
        }
    }

    /// Recompute from every payment on the invoice. A total outside the
    /// decimal range is `InvalidAmount`.
    pub fn of<'a>(
        grand_total: Money,
        payments: impl IntoIterator<Item = &'a Payment>,
    ) -> DomainResult<Self> {
        let too_large = || DomainError::invalid_amount("total paid is too large");
        let paid_amount =
            Money::checked_sum(payments.into_iter().map(|p| p.amount)).ok_or_else(too_large)?;
        let due_amount = grand_total.checked_sub(paid_amount).ok_or_else(too_large)?;
        Ok(Self {
            paid_amount,
            due_amount,
            payment_status: PaymentStatus::derive(paid_amount, grand_total),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn payment(amount: Decimal) -> Payment {
        Payment {
            payment_id: PaymentId::new(),
            mode: PaymentMode::Upi,
            amount: Money::new(amount),
            payment_date: NaiveDate::from_ymd_opt(2024, 1, 20).unwrap(),
            metadata: PaymentMetadata::default(),
            created_by: "asha".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn status_follows_paid_vs_grand() {
        let grand = Money::new(dec!(1298));
        assert_eq!(PaymentStatus::derive(Money::zero(), grand), PaymentStatus::Due);
        assert_eq!(PaymentStatus::derive(Money::new(dec!(0.01)), grand), PaymentStatus::Partial);
        assert_eq!(PaymentStatus::derive(grand, grand), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::derive(Money::new(dec!(2000)), grand), PaymentStatus::Paid);
    }

    #[test]
    fn overpayment_leaves_negative_due() {
        let s = Settlement::of(Money::new(dec!(100)), &[payment(dec!(60)), payment(dec!(60))]).unwrap();
        assert_eq!(s.paid_amount, Money::new(dec!(120)));
        assert_eq!(s.due_amount, Money::new(dec!(-20)));
        assert_eq!(s.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn unpaid_zero_total_is_already_paid() {
        assert_eq!(Settlement::unpaid(Money::zero()).payment_status, PaymentStatus::Paid);
        let s = Settlement::unpaid(Money::new(dec!(448)));
        assert_eq!(s.due_amount, Money::new(dec!(448)));
        assert_eq!(s.payment_status, PaymentStatus::Due);
    }

    #[test]
    fn paid_total_overflow_is_an_invalid_amount() {
        let payments = [payment(Decimal::MAX), payment(Decimal::MAX)];
        assert!(matches!(
            Settlement::of(Money::new(dec!(100)), &payments),
            Err(DomainError::InvalidAmount(_))
        ));

        // Paid fits, due does not.
        assert!(matches!(
            Settlement::of(Money::new(Decimal::MIN), &[payment(dec!(1))]),
            Err(DomainError::InvalidAmount(_))
        ));
    }

    #[test]
    fn serializes_modes_in_legal_vocabulary() {
        assert_eq!(
            serde_json::to_string(&PaymentMode::BankTransfer).unwrap(),
            "\"BANK_TRANSFER\""
        );
        assert_eq!(serde_json::to_string(&PaymentStatus::Partial).unwrap(), "\"PARTIAL\"");
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// paid + due == grand after any sequence of payments, and the status
        /// is PAID iff paid >= grand, DUE iff paid == 0, else PARTIAL.
        #[test]
        fn settlement_is_consistent(
            grand_cents in 1i64..10_000_000,
            amounts in prop::collection::vec(1i64..2_000_000, 0..10),
        ) {
            let grand = Money::new(Decimal::new(grand_cents, 2));
            let payments: Vec<_> = amounts.iter().map(|c| payment(Decimal::new(*c, 2))).collect();

            for n in 0..=payments.len() {
                let s = Settlement::of(grand, &payments[..n]).unwrap();
                prop_assert_eq!(s.paid_amount.amount() + s.due_amount.amount(), grand.amount());
                prop_assert_eq!(s.payment_status == PaymentStatus::Paid, s.paid_amount >= grand);
                prop_assert_eq!(s.payment_status == PaymentStatus::Due, s.paid_amount.is_zero());
            }
        }
    }
}
