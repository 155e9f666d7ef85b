//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random ledger data
//! that maintains domain invariants.

use chrono::NaiveDate;
use core_kernel::Money;
use domain_fees::{Cadence, PaymentMethod, PaymentStatus};
use proptest::prelude::*;

/// Strategy for every cadence
pub fn cadence_strategy() -> impl Strategy<Value = Cadence> {
    proptest::sample::select(Cadence::ALL.to_vec())
}

pub fn payment_method_strategy() -> impl Strategy<Value = PaymentMethod> {
    prop_oneof![
        Just(PaymentMethod::Cash),
        Just(PaymentMethod::BankTransfer),
        Just(PaymentMethod::CreditCard),
        Just(PaymentMethod::DebitCard),
        Just(PaymentMethod::Online),
        Just(PaymentMethod::MobilePayment),
    ]
}

/// Payment statuses, weighted towards completed
pub fn payment_status_strategy() -> impl Strategy<Value = PaymentStatus> {
    prop_oneof![
        6 => Just(PaymentStatus::Completed),
        2 => Just(PaymentStatus::Pending),
        1 => Just(PaymentStatus::Failed),
        1 => Just(PaymentStatus::Refunded),
    ]
}

/// Strategy for positive amounts in cents
pub fn positive_cents_strategy() -> impl Strategy<Value = i64> {
    1i64..100_000_000i64
}

/// Strategy for positive Money values with two decimal places
pub fn positive_money_strategy() -> impl Strategy<Value = Money> {
    positive_cents_strategy().prop_map(|cents| Money::from_minor(cents, 2))
}

/// Unit amounts a fee type might plausibly carry
pub fn unit_amount_strategy() -> impl Strategy<Value = Money> {
    (1i64..500_000i64).prop_map(|cents| Money::from_minor(cents, 2))
}

/// A unit amount, a cadence and a discount no larger than the gross
pub fn unit_and_discount_strategy() -> impl Strategy<Value = (Money, Cadence, Money)> {
    (1i64..500_000i64, cadence_strategy()).prop_flat_map(|(unit_cents, cadence)| {
        let gross_cents = unit_cents * i64::from(cadence.billing_periods());
        (
            Just(Money::from_minor(unit_cents, 2)),
            Just(cadence),
            (0i64..=gross_cents).prop_map(|cents| Money::from_minor(cents, 2)),
        )
    })
}

/// Sequences of payment attempts, each in cents
pub fn payment_sequence_strategy(max_len: usize) -> impl Strategy<Value = Vec<Money>> {
    prop::collection::vec((1i64..50_000i64).prop_map(|c| Money::from_minor(c, 2)), 1..max_len)
}

/// Dates within the 2025-2026 academic year
pub fn academic_date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..303).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2025, 9, 1).unwrap() + chrono::Duration::days(offset)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_fees::calculate;

    proptest! {
        #[test]
        fn test_positive_money_is_positive(money in positive_money_strategy()) {
            prop_assert!(money.is_positive());
        }

        #[test]
        fn test_generated_discounts_are_valid((unit, cadence, discount) in unit_and_discount_strategy()) {
            prop_assert!(calculate(unit, cadence, discount).is_ok());
        }

        #[test]
        fn test_academic_dates_stay_in_year(date in academic_date_strategy()) {
            prop_assert!(date >= NaiveDate::from_ymd_opt(2025, 9, 1).unwrap());
            prop_assert!(date <= NaiveDate::from_ymd_opt(2026, 6, 30).unwrap());
        }
    }
}
