//! Custom Test Assertions
//!
//! Provides specialized assertion helpers for ledger types that give
//! more meaningful error messages than standard assertions.

use core_kernel::Money;
use domain_fees::{Fee, FeeError, Payment, PaymentSchedule, ScheduleStatus};

/// Asserts two amounts are numerically equal, whatever their scale
pub fn assert_money_eq(actual: Money, expected: Money) {
    assert!(
        actual == expected,
        "Money mismatch: actual={}, expected={}",
        actual,
        expected
    );
}

/// Asserts the stored balances of a fee are internally consistent
///
/// # Panics
///
/// Panics if the discount exceeds the total, the paid amount exceeds the net
/// amount, or any amount is negative
pub fn assert_fee_consistent(fee: &Fee) {
    assert!(
        !fee.total_amount.is_negative() && !fee.discount_amount.is_negative() && !fee.paid_amount.is_negative(),
        "Fee {} has a negative amount: total={}, discount={}, paid={}",
        fee.id,
        fee.total_amount,
        fee.discount_amount,
        fee.paid_amount
    );
    assert!(
        fee.discount_amount <= fee.total_amount,
        "Fee {} discount {} exceeds total {}",
        fee.id,
        fee.discount_amount,
        fee.total_amount
    );
    assert!(
        fee.paid_amount <= fee.net_amount(),
        "Fee {} paid {} exceeds net {}",
        fee.id,
        fee.paid_amount,
        fee.net_amount()
    );
}

/// Asserts the fee's paid amount is the sum of its counting payments
pub fn assert_paid_matches_payments(fee: &Fee, payments: &[Payment]) {
    let counted: Money = payments
        .iter()
        .filter(|p| p.fee_id == fee.id)
        .map(|p| p.effective_amount())
        .sum();
    assert!(
        counted == fee.paid_amount,
        "Fee {} paid amount {} does not match its payments {}",
        fee.id,
        fee.paid_amount,
        counted
    );
}

/// Asserts an installment plan covers the net amount exactly
///
/// Also checks indices run 1..=n, due dates strictly increase and every
/// installment's paid amount stays within its amount.
pub fn assert_plan_consistent(plan: &[PaymentSchedule], net: Money) {
    let total: Money = plan.iter().map(|s| s.amount).sum();
    assert!(total == net, "Installments sum to {}, expected {}", total, net);

    for (position, schedule) in plan.iter().enumerate() {
        assert_eq!(
            schedule.installment as usize,
            position + 1,
            "Installment indices must run from 1 without gaps"
        );
        assert!(
            schedule.paid_amount <= schedule.amount,
            "Installment {} paid {} exceeds amount {}",
            schedule.installment,
            schedule.paid_amount,
            schedule.amount
        );
        if schedule.status == ScheduleStatus::Paid {
            assert!(schedule.remaining().is_zero());
        }
    }

    for pair in plan.windows(2) {
        assert!(
            pair[0].due_date < pair[1].due_date,
            "Due dates must increase: {} then {}",
            pair[0].due_date,
            pair[1].due_date
        );
    }
}

/// Asserts a result failed with a balance overrun
pub fn assert_exceeds_balance<T: std::fmt::Debug>(result: Result<T, FeeError>) {
    match result {
        Err(FeeError::AmountExceedsBalance { .. }) => {}
        other => panic!("Expected AmountExceedsBalance, got {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::FeeBuilder;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_eq_ignores_scale() {
        assert_money_eq(Money::new(dec!(250.00)), Money::new(dec!(250)));
    }

    #[test]
    fn test_built_fee_is_consistent() {
        assert_fee_consistent(&FeeBuilder::new().with_paid(Money::new(dec!(300))).build());
    }

    #[test]
    #[should_panic(expected = "exceeds net")]
    fn test_overpaid_fee_detected() {
        let mut fee = FeeBuilder::new().build();
        fee.paid_amount = Money::new(dec!(1000.01));
        assert_fee_consistent(&fee);
    }

    #[test]
    fn test_empty_payments_match_unpaid_fee() {
        assert_paid_matches_payments(&FeeBuilder::new().build(), &[]);
    }
}
