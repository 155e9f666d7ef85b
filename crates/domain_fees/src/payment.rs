//! Payments
//!
//! A payment is one monetary transaction against a fee, optionally allocated
//! to one installment. Only payments whose status counts toward the balance
//! contribute to the fee and installment paid amounts.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{FeeId, Money, PaymentId, ScheduleId, StudentId, UserId};

use crate::error::FeeError;

/// How a payment was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Check,
    CreditCard,
    DebitCard,
    Online,
    MobilePayment,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Check => "check",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::Online => "online",
            PaymentMethod::MobilePayment => "mobile_payment",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "check" => Ok(PaymentMethod::Check),
            "credit_card" => Ok(PaymentMethod::CreditCard),
            "debit_card" => Ok(PaymentMethod::DebitCard),
            "online" => Ok(PaymentMethod::Online),
            "mobile_payment" => Ok(PaymentMethod::MobilePayment),
            other => Err(format!("Unknown payment method: {}", other)),
        }
    }
}

/// Processing status of a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Completed,
    Pending,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Completed and pending payments are reflected in the paid amounts
    pub fn counts_toward_balance(&self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Completed => "completed",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(PaymentStatus::Completed),
            "pending" => Ok(PaymentStatus::Pending),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(format!("Unknown payment status: {}", other)),
        }
    }
}

/// A recorded payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub fee_id: FeeId,
    /// Installment the payment is allocated to, if any
    pub schedule_id: Option<ScheduleId>,
    pub student_id: StudentId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub payment_date: NaiveDate,
    pub check_number: Option<String>,
    pub check_due_date: Option<NaiveDate>,
    pub transaction_ref: Option<String>,
    pub receipt_number: String,
    pub status: PaymentStatus,
    pub processed_by: UserId,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Amount this payment contributes to the fee and installment balances
    pub fn effective_amount(&self) -> Money {
        effective_amount(self.amount, self.status)
    }
}

/// `amount` if `status` counts toward the balance, zero otherwise
pub fn effective_amount(amount: Money, status: PaymentStatus) -> Money {
    if status.counts_toward_balance() {
        amount
    } else {
        Money::ZERO
    }
}

/// Request to record a payment
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub fee_id: FeeId,
    pub schedule_id: Option<ScheduleId>,
    pub amount: Money,
    pub method: PaymentMethod,
    pub payment_date: NaiveDate,
    pub check_number: Option<String>,
    pub check_due_date: Option<NaiveDate>,
    pub transaction_ref: Option<String>,
    /// Generated when absent
    pub receipt_number: Option<String>,
    /// Defaults to completed
    pub status: Option<PaymentStatus>,
    pub notes: Option<String>,
}

impl NewPayment {
    /// A completed cash payment with no allocation
    pub fn cash(fee_id: FeeId, amount: Money, payment_date: NaiveDate) -> Self {
        Self {
            fee_id,
            schedule_id: None,
            amount,
            method: PaymentMethod::Cash,
            payment_date,
            check_number: None,
            check_due_date: None,
            transaction_ref: None,
            receipt_number: None,
            status: None,
            notes: None,
        }
    }

    /// Allocates the payment to an installment
    pub fn for_schedule(mut self, schedule_id: ScheduleId) -> Self {
        self.schedule_id = Some(schedule_id);
        self
    }

    /// Switches the payment to a check
    pub fn by_check(mut self, number: impl Into<String>, due_date: Option<NaiveDate>) -> Self {
        self.method = PaymentMethod::Check;
        self.check_number = Some(number.into());
        self.check_due_date = due_date;
        self
    }

    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// Changes to an existing payment; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct PaymentPatch {
    pub amount: Option<Money>,
    pub method: Option<PaymentMethod>,
    pub payment_date: Option<NaiveDate>,
    pub check_number: Option<String>,
    pub check_due_date: Option<NaiveDate>,
    pub transaction_ref: Option<String>,
    pub receipt_number: Option<String>,
    pub status: Option<PaymentStatus>,
    pub notes: Option<String>,
}

impl PaymentPatch {
    pub fn amount(amount: Money) -> Self {
        Self {
            amount: Some(amount),
            ..Default::default()
        }
    }

    pub fn status(status: PaymentStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Applies the patch to a copy of `payment`
    pub fn apply(&self, payment: &Payment) -> Payment {
        let mut updated = payment.clone();
        if let Some(amount) = self.amount {
            updated.amount = amount;
        }
        if let Some(method) = self.method {
            updated.method = method;
        }
        if let Some(date) = self.payment_date {
            updated.payment_date = date;
        }
        if let Some(ref number) = self.check_number {
            updated.check_number = Some(number.clone());
        }
        if let Some(due) = self.check_due_date {
            updated.check_due_date = Some(due);
        }
        if let Some(ref reference) = self.transaction_ref {
            updated.transaction_ref = Some(reference.clone());
        }
        if let Some(ref receipt) = self.receipt_number {
            updated.receipt_number = receipt.clone();
        }
        if let Some(status) = self.status {
            updated.status = status;
        }
        if let Some(ref notes) = self.notes {
            updated.notes = Some(notes.clone());
        }
        updated.updated_at = Utc::now();
        updated
    }
}

/// Rejects non-positive payment amounts
pub fn validate_amount(amount: Money) -> Result<(), FeeError> {
    if !amount.is_positive() {
        return Err(FeeError::InvalidAmount(format!(
            "payment amount must be greater than zero, got {}",
            amount
        )));
    }
    Ok(())
}

/// Check payments need a number and a due date no earlier than today
pub fn validate_check(
    method: PaymentMethod,
    check_number: Option<&str>,
    check_due_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<(), FeeError> {
    if method != PaymentMethod::Check {
        return Ok(());
    }
    if check_number.map_or(true, |n| n.trim().is_empty()) {
        return Err(FeeError::CheckNumberRequired);
    }
    if let Some(due_date) = check_due_date {
        if due_date < today {
            return Err(FeeError::CheckDueDateInPast { due_date, today });
        }
    }
    Ok(())
}

/// Generates a receipt number such as `RCP-20250915-1A2B3C4D`
pub fn generate_receipt_number(prefix: &str, date: NaiveDate) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("{}-{}-{}", prefix, date.format("%Y%m%d"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_counts_toward_balance() {
        assert!(PaymentStatus::Completed.counts_toward_balance());
        assert!(PaymentStatus::Pending.counts_toward_balance());
        assert!(!PaymentStatus::Failed.counts_toward_balance());
        assert!(!PaymentStatus::Refunded.counts_toward_balance());
    }

    #[test]
    fn test_effective_amount() {
        let amount = Money::new(dec!(120));
        assert_eq!(effective_amount(amount, PaymentStatus::Completed), amount);
        assert_eq!(effective_amount(amount, PaymentStatus::Refunded), Money::ZERO);
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(Money::new(dec!(0.01))).is_ok());
        assert!(validate_amount(Money::ZERO).is_err());
        assert!(validate_amount(Money::new(dec!(-5))).is_err());
    }

    #[test]
    fn test_check_requires_number() {
        let today = date(2025, 10, 1);
        assert!(matches!(
            validate_check(PaymentMethod::Check, None, None, today),
            Err(FeeError::CheckNumberRequired)
        ));
        assert!(matches!(
            validate_check(PaymentMethod::Check, Some("  "), None, today),
            Err(FeeError::CheckNumberRequired)
        ));
        assert!(validate_check(PaymentMethod::Cash, None, None, today).is_ok());
    }

    #[test]
    fn test_check_due_date_not_in_past() {
        let today = date(2025, 10, 1);
        assert!(validate_check(PaymentMethod::Check, Some("CHK-1"), Some(today), today).is_ok());
        assert!(matches!(
            validate_check(PaymentMethod::Check, Some("CHK-1"), Some(date(2025, 9, 30)), today),
            Err(FeeError::CheckDueDateInPast { .. })
        ));
    }

    #[test]
    fn test_receipt_number_format() {
        let receipt = generate_receipt_number("RCP", date(2025, 9, 15));
        assert!(receipt.starts_with("RCP-20250915-"));
        assert_eq!(receipt.len(), "RCP-20250915-".len() + 8);
        assert_ne!(receipt, generate_receipt_number("RCP", date(2025, 9, 15)));
    }
}
