//! Installment schedules
//!
//! A fee's net amount is split into installments by its cadence. Every
//! installment but the last receives the net amount divided by the count,
//! floored to the currency's minor unit; the last one absorbs the remainder so
//! the plan always sums to the net amount exactly.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{FeeId, Money, ScheduleId};

use crate::cadence::Cadence;
use crate::config::LedgerConfig;
use crate::error::FeeError;

/// Status of one installment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Pending,
    PartiallyPaid,
    Paid,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Pending => "pending",
            ScheduleStatus::PartiallyPaid => "partially_paid",
            ScheduleStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ScheduleStatus::Pending),
            "partially_paid" => Ok(ScheduleStatus::PartiallyPaid),
            "paid" => Ok(ScheduleStatus::Paid),
            other => Err(format!("Unknown schedule status: {}", other)),
        }
    }
}

/// One due-date slice of a fee's net amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSchedule {
    pub id: ScheduleId,
    pub fee_id: FeeId,
    /// 1-based position in the plan
    pub installment: u32,
    pub due_date: NaiveDate,
    pub amount: Money,
    pub paid_amount: Money,
    pub status: ScheduleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentSchedule {
    /// Amount of this installment still owed, never negative
    pub fn remaining(&self) -> Money {
        self.amount.saturating_sub(&self.paid_amount)
    }

    /// True once the installment is fully paid
    pub fn is_settled(&self) -> bool {
        self.status == ScheduleStatus::Paid
    }

    /// True if the installment fell due before `today` and is not fully paid
    pub fn is_past_due(&self, today: NaiveDate) -> bool {
        self.due_date < today && !self.is_settled()
    }
}

/// Splits `net` into `count` installment amounts floored to `scale`
///
/// The last amount absorbs the rounding remainder.
pub fn plan_amounts(net: Money, count: u32, scale: u32) -> Result<Vec<Money>, FeeError> {
    if net.is_negative() {
        return Err(FeeError::InvalidAmount(format!(
            "net amount must not be negative, got {}",
            net
        )));
    }
    Ok(net.split_remainder_last(count, scale)?)
}

/// Builds the installment plan of a fee
///
/// Installment `i` (1-based) falls due `i` cadence strides after `start`.
pub fn generate(
    fee_id: FeeId,
    cadence: Cadence,
    net: Money,
    start: NaiveDate,
    config: &LedgerConfig,
) -> Result<Vec<PaymentSchedule>, FeeError> {
    let amounts = plan_amounts(net, cadence.installment_count(), config.currency_scale)?;
    let now = Utc::now();

    amounts
        .into_iter()
        .zip(1u32..)
        .map(|(amount, installment)| -> Result<PaymentSchedule, FeeError> {
            let due_date = cadence.due_date(start, installment, config.one_time_due_days)?;
            Ok(PaymentSchedule {
                id: ScheduleId::new_v7(),
                fee_id,
                installment,
                due_date,
                amount,
                paid_amount: Money::ZERO,
                status: ScheduleStatus::Pending,
                created_at: now,
                updated_at: now,
            })
        })
        .collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn cadence_strategy() -> impl Strategy<Value = Cadence> {
        prop::sample::select(Cadence::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn plan_sums_to_net(
            minor in 0i64..100_000_000i64,
            cadence in cadence_strategy(),
            scale in 0u32..3u32,
        ) {
            let net = Money::from_minor(minor, scale);
            let config = LedgerConfig::default().with_currency_scale(scale);
            let start = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
            let plan = generate(FeeId::new(), cadence, net, start, &config).unwrap();

            prop_assert_eq!(plan.len() as u32, cadence.installment_count());
            prop_assert_eq!(plan.iter().map(|s| s.amount).sum::<Money>(), net);
            prop_assert!(plan.windows(2).all(|w| w[0].due_date < w[1].due_date));
        }
    }
}
