//! Status derivation
//!
//! Statuses are never set by hand: they follow from the balances and, for
//! overdue fees, from the installment due dates. Cancelled is the only
//! exception and is never re-derived.

use chrono::NaiveDate;

use core_kernel::Money;

use crate::fee::{Fee, FeeStatus};
use crate::schedule::{PaymentSchedule, ScheduleStatus};

/// Derives the status of a fee as of `today`
pub fn derive_fee_status(fee: &Fee, schedules: &[PaymentSchedule], today: NaiveDate) -> FeeStatus {
    if fee.is_cancelled() {
        return FeeStatus::Cancelled;
    }

    if fee.paid_amount >= fee.net_amount() {
        FeeStatus::Paid
    } else if fee.paid_amount.is_positive() {
        FeeStatus::PartiallyPaid
    } else if schedules.iter().any(|s| s.is_past_due(today)) {
        FeeStatus::Overdue
    } else {
        FeeStatus::Pending
    }
}

/// Derives the status of an installment from its amount and paid amount
pub fn derive_schedule_status(amount: Money, paid: Money) -> ScheduleStatus {
    if paid >= amount {
        ScheduleStatus::Paid
    } else if paid.is_positive() {
        ScheduleStatus::PartiallyPaid
    } else {
        ScheduleStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cadence::Cadence;
    use crate::calculator::calculate;
    use crate::config::LedgerConfig;
    use crate::schedule::generate;
    use core_kernel::{AcademicYear, FeeTypeId, StudentId, UserId};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fee_of(net: Money) -> Fee {
        Fee::new(
            StudentId::new(),
            FeeTypeId::new(),
            AcademicYear::new(2025),
            Cadence::OneTime,
            calculate(net, Cadence::OneTime, Money::ZERO).unwrap(),
            UserId::new(),
        )
    }

    #[test]
    fn test_fee_status_from_balances() {
        let today = date(2025, 10, 1);
        let mut fee = fee_of(Money::new(dec!(500)));

        fee.paid_amount = Money::new(dec!(500));
        assert_eq!(derive_fee_status(&fee, &[], today), FeeStatus::Paid);

        fee.paid_amount = Money::new(dec!(200));
        assert_eq!(derive_fee_status(&fee, &[], today), FeeStatus::PartiallyPaid);

        fee.paid_amount = Money::ZERO;
        assert_eq!(derive_fee_status(&fee, &[], today), FeeStatus::Pending);
    }

    #[test]
    fn test_unpaid_past_due_installment_is_overdue() {
        let fee = fee_of(Money::new(dec!(500)));
        let schedules = generate(
            fee.id,
            Cadence::OneTime,
            fee.net_amount(),
            date(2025, 9, 1),
            &LedgerConfig::default(),
        )
        .unwrap();

        assert_eq!(derive_fee_status(&fee, &schedules, date(2025, 10, 1)), FeeStatus::Pending);
        assert_eq!(derive_fee_status(&fee, &schedules, date(2025, 10, 2)), FeeStatus::Overdue);
    }

    #[test]
    fn test_cancelled_is_sticky() {
        let mut fee = fee_of(Money::new(dec!(500)));
        fee.status = FeeStatus::Cancelled;
        fee.paid_amount = Money::new(dec!(500));
        assert_eq!(derive_fee_status(&fee, &[], date(2025, 10, 1)), FeeStatus::Cancelled);
    }

    #[test]
    fn test_fully_discounted_fee_is_paid() {
        let fee = fee_of(Money::ZERO);
        assert_eq!(derive_fee_status(&fee, &[], date(2025, 10, 1)), FeeStatus::Paid);
    }

    #[test]
    fn test_schedule_status() {
        let amount = Money::new(dec!(250));
        assert_eq!(derive_schedule_status(amount, Money::ZERO), ScheduleStatus::Pending);
        assert_eq!(derive_schedule_status(amount, Money::new(dec!(1))), ScheduleStatus::PartiallyPaid);
        assert_eq!(derive_schedule_status(amount, amount), ScheduleStatus::Paid);
    }
}
