//! Fees and fee types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{AcademicYear, FeeId, FeeTypeId, Money, StudentId, UserId};

use crate::cadence::Cadence;
use crate::calculator::FeeAmounts;

/// Category of a fee type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeCategory {
    Tuition,
    Registration,
    Transport,
    Books,
    Uniform,
    Activity,
    Exam,
    Other,
}

impl FeeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeCategory::Tuition => "tuition",
            FeeCategory::Registration => "registration",
            FeeCategory::Transport => "transport",
            FeeCategory::Books => "books",
            FeeCategory::Uniform => "uniform",
            FeeCategory::Activity => "activity",
            FeeCategory::Exam => "exam",
            FeeCategory::Other => "other",
        }
    }
}

impl FromStr for FeeCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tuition" => Ok(FeeCategory::Tuition),
            "registration" => Ok(FeeCategory::Registration),
            "transport" => Ok(FeeCategory::Transport),
            "books" => Ok(FeeCategory::Books),
            "uniform" => Ok(FeeCategory::Uniform),
            "activity" => Ok(FeeCategory::Activity),
            "exam" => Ok(FeeCategory::Exam),
            "other" => Ok(FeeCategory::Other),
            other => Err(format!("Unknown fee category: {}", other)),
        }
    }
}

/// A catalog entry: what is charged and the unit amount per billing period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeType {
    pub id: FeeTypeId,
    pub name: String,
    pub category: FeeCategory,
    /// Amount charged per billing period
    pub amount: Money,
}

impl FeeType {
    pub fn new(name: impl Into<String>, category: FeeCategory, amount: Money) -> Self {
        Self {
            id: FeeTypeId::new_v7(),
            name: name.into(),
            category,
            amount,
        }
    }
}

/// Lifecycle status of a fee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeStatus {
    Pending,
    PartiallyPaid,
    Paid,
    Overdue,
    Cancelled,
}

impl FeeStatus {
    /// Cancelled fees are never re-derived and accept no payments
    pub fn is_terminal(&self) -> bool {
        matches!(self, FeeStatus::Cancelled)
    }

    /// Statuses the overdue sweep has to look at
    pub fn is_open(&self) -> bool {
        matches!(self, FeeStatus::Pending | FeeStatus::PartiallyPaid | FeeStatus::Overdue)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeeStatus::Pending => "pending",
            FeeStatus::PartiallyPaid => "partially_paid",
            FeeStatus::Paid => "paid",
            FeeStatus::Overdue => "overdue",
            FeeStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for FeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(FeeStatus::Pending),
            "partially_paid" => Ok(FeeStatus::PartiallyPaid),
            "paid" => Ok(FeeStatus::Paid),
            "overdue" => Ok(FeeStatus::Overdue),
            "cancelled" => Ok(FeeStatus::Cancelled),
            other => Err(format!("Unknown fee status: {}", other)),
        }
    }
}

/// One charge assigned to a student for an academic year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    pub id: FeeId,
    pub student_id: StudentId,
    pub fee_type_id: FeeTypeId,
    pub academic_year: AcademicYear,
    pub cadence: Cadence,
    /// Gross amount before discount
    pub total_amount: Money,
    pub discount_amount: Money,
    /// Running total of payments that count toward the balance
    pub paid_amount: Money,
    pub status: FeeStatus,
    pub notes: Option<String>,
    pub assigned_by: UserId,
    /// Optimistic-concurrency token, bumped by every mutation of the fee or its installments
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Fee {
    /// Creates a pending, unpaid fee
    pub fn new(
        student_id: StudentId,
        fee_type_id: FeeTypeId,
        academic_year: AcademicYear,
        cadence: Cadence,
        amounts: FeeAmounts,
        assigned_by: UserId,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: FeeId::new_v7(),
            student_id,
            fee_type_id,
            academic_year,
            cadence,
            total_amount: amounts.total,
            discount_amount: amounts.discount,
            paid_amount: Money::ZERO,
            status: FeeStatus::Pending,
            notes: None,
            assigned_by,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the notes
    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    /// Total minus discount
    pub fn net_amount(&self) -> Money {
        self.total_amount - self.discount_amount
    }

    /// Net amount still owed, never negative
    pub fn remaining(&self) -> Money {
        self.net_amount().saturating_sub(&self.paid_amount)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == FeeStatus::Cancelled
    }

    /// Balance snapshot
    pub fn balance(&self) -> FeeBalance {
        FeeBalance {
            fee_id: self.id,
            net_amount: self.net_amount(),
            paid_amount: self.paid_amount,
            remaining: self.remaining(),
            status: self.status,
        }
    }

    /// Marks the fee as changed, bumping its version
    pub(crate) fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

/// Balance of a fee as exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBalance {
    pub fee_id: FeeId,
    pub net_amount: Money,
    pub paid_amount: Money,
    pub remaining: Money,
    pub status: FeeStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_fee() -> Fee {
        Fee::new(
            StudentId::new(),
            FeeTypeId::new(),
            AcademicYear::new(2025),
            Cadence::Quarterly,
            FeeAmounts {
                total: Money::new(dec!(1200)),
                discount: Money::new(dec!(200)),
                net: Money::new(dec!(1000)),
            },
            UserId::new(),
        )
    }

    #[test]
    fn test_new_fee_is_pending_and_unpaid() {
        let fee = sample_fee();
        assert_eq!(fee.status, FeeStatus::Pending);
        assert_eq!(fee.paid_amount, Money::ZERO);
        assert_eq!(fee.version, 1);
    }

    #[test]
    fn test_balance() {
        let mut fee = sample_fee();
        fee.paid_amount = Money::new(dec!(250));

        let balance = fee.balance();
        assert_eq!(balance.net_amount.amount(), dec!(1000));
        assert_eq!(balance.remaining.amount(), dec!(750));
    }

    #[test]
    fn test_touch_bumps_version() {
        let mut fee = sample_fee();
        fee.touch();
        fee.touch();
        assert_eq!(fee.version, 3);
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_string(&FeeStatus::PartiallyPaid).unwrap(), "\"partially_paid\"");
        assert_eq!("overdue".parse::<FeeStatus>().unwrap(), FeeStatus::Overdue);
        assert!(FeeStatus::Cancelled.is_terminal());
        assert!(!FeeStatus::Paid.is_open());
    }
}
