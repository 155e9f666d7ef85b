//! Fee ledger errors

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use core_kernel::{
    AcademicYear, FeeId, FeeTypeId, Money, MoneyError, PaymentId, PortError, ScheduleId, StudentId,
    TemporalError,
};

/// Which balance an amount was checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceScope {
    Fee,
    Schedule,
}

impl fmt::Display for BalanceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BalanceScope::Fee => write!(f, "fee"),
            BalanceScope::Schedule => write!(f, "installment"),
        }
    }
}

/// Coarse classification of a [`FeeError`], used by callers to pick a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A referenced entity does not exist
    NotFound,
    /// The input is malformed
    Validation,
    /// The input is well formed but violates a ledger rule
    BusinessRule,
    /// Another writer changed the same fee; the caller may retry
    Conflict,
    /// The storage layer failed
    Infrastructure,
}

/// Errors that can occur in the fee ledger
#[derive(Debug, Error)]
pub enum FeeError {
    /// Fee not found
    #[error("Fee not found: {0}")]
    FeeNotFound(FeeId),

    /// Installment not found
    #[error("Payment schedule not found: {0}")]
    ScheduleNotFound(ScheduleId),

    /// Payment not found
    #[error("Payment not found: {0}")]
    PaymentNotFound(PaymentId),

    /// Student not found
    #[error("Student not found: {0}")]
    StudentNotFound(StudentId),

    /// Fee type not found
    #[error("Fee type not found: {0}")]
    FeeTypeNotFound(FeeTypeId),

    /// Malformed or out-of-range amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Discount is larger than the gross amount
    #[error("Discount {discount} exceeds gross amount {gross}")]
    InvalidDiscount {
        gross: Money,
        discount: Money,
    },

    /// Check payments need a check number
    #[error("Check number is required for check payments")]
    CheckNumberRequired,

    /// Check due date lies before today
    #[error("Check due date {due_date} is in the past (today is {today})")]
    CheckDueDateInPast {
        due_date: NaiveDate,
        today: NaiveDate,
    },

    /// Date range with start after end
    #[error("Invalid date range: {0}")]
    InvalidDateRange(#[from] TemporalError),

    /// A fee already exists for this student, fee type and academic year
    #[error("Fee already assigned for student {student_id}, fee type {fee_type_id}, academic year {academic_year}")]
    DuplicateFee {
        student_id: StudentId,
        fee_type_id: FeeTypeId,
        academic_year: AcademicYear,
    },

    /// Receipt number is already used by another payment
    #[error("Receipt number already exists: {0}")]
    DuplicateReceipt(String),

    /// Payment would push the paid amount beyond the net amount
    #[error("Payment amount {attempted} exceeds remaining {scope} balance {remaining}")]
    AmountExceedsBalance {
        scope: BalanceScope,
        remaining: Money,
        attempted: Money,
    },

    /// An edit would bring the net amount below what was already paid
    #[error("New net amount {net} is below the amount already paid {paid}")]
    NetBelowPaid {
        net: Money,
        paid: Money,
    },

    /// The fee is cancelled and accepts no further payments
    #[error("Fee {0} is cancelled")]
    FeeCancelled(FeeId),

    /// The fee still has payments referencing it
    #[error("Fee {fee_id} has {count} payment(s) and cannot be deleted")]
    FeeHasPayments {
        fee_id: FeeId,
        count: usize,
    },

    /// The installment belongs to another fee
    #[error("Payment schedule {schedule_id} does not belong to fee {fee_id}")]
    ScheduleFeeMismatch {
        schedule_id: ScheduleId,
        fee_id: FeeId,
    },

    /// Installments were already generated for this fee
    #[error("Fee {fee_id} already has {count} installment(s)")]
    SchedulesAlreadyGenerated {
        fee_id: FeeId,
        count: usize,
    },

    /// The installment plan cannot be replaced because some installment was paid
    #[error("Fee {0} has paid installments; the schedule cannot be replaced")]
    SchedulesHavePayments(FeeId),

    /// Lost the optimistic-concurrency race too many times
    #[error("Fee {fee_id} was modified concurrently; gave up after {attempts} attempt(s)")]
    ConcurrentModification {
        fee_id: FeeId,
        attempts: u32,
    },

    /// Storage failure
    #[error("Storage error: {0}")]
    Storage(#[from] PortError),
}

impl From<MoneyError> for FeeError {
    fn from(err: MoneyError) -> Self {
        FeeError::InvalidAmount(err.to_string())
    }
}

impl FeeError {
    /// Classifies the error for callers
    pub fn kind(&self) -> ErrorKind {
        match self {
            FeeError::FeeNotFound(_)
            | FeeError::ScheduleNotFound(_)
            | FeeError::PaymentNotFound(_)
            | FeeError::StudentNotFound(_)
            | FeeError::FeeTypeNotFound(_) => ErrorKind::NotFound,

            FeeError::InvalidAmount(_)
            | FeeError::InvalidDiscount { .. }
            | FeeError::CheckNumberRequired
            | FeeError::InvalidDateRange(_)
            | FeeError::ScheduleFeeMismatch { .. } => ErrorKind::Validation,

            FeeError::CheckDueDateInPast { .. }
            | FeeError::DuplicateFee { .. }
            | FeeError::DuplicateReceipt(_)
            | FeeError::AmountExceedsBalance { .. }
            | FeeError::NetBelowPaid { .. }
            | FeeError::FeeCancelled(_)
            | FeeError::FeeHasPayments { .. }
            | FeeError::SchedulesAlreadyGenerated { .. }
            | FeeError::SchedulesHavePayments(_) => ErrorKind::BusinessRule,

            FeeError::ConcurrentModification { .. } => ErrorKind::Conflict,

            FeeError::Storage(port) => match port {
                PortError::NotFound { .. } => ErrorKind::NotFound,
                PortError::Validation { .. } => ErrorKind::Validation,
                PortError::Conflict { .. } => ErrorKind::Conflict,
                _ => ErrorKind::Infrastructure,
            },
        }
    }

    /// Figures that let a caller correct and retry a rejected request
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            FeeError::AmountExceedsBalance { scope, remaining, attempted } => Some(serde_json::json!({
                "scope": scope,
                "remaining": remaining,
                "attempted": attempted,
            })),
            FeeError::InvalidDiscount { gross, discount } => Some(serde_json::json!({
                "gross": gross,
                "discount": discount,
            })),
            FeeError::NetBelowPaid { net, paid } => Some(serde_json::json!({
                "net": net,
                "paid": paid,
            })),
            FeeError::FeeHasPayments { count, .. } => Some(serde_json::json!({ "payments": count })),
            FeeError::SchedulesAlreadyGenerated { count, .. } => {
                Some(serde_json::json!({ "installments": count }))
            }
            _ => None,
        }
    }
}
