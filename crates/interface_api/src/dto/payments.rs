//! Payment DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{FeeId, Money, ScheduleId};
use domain_fees::{NewPayment, Payment, PaymentMethod, PaymentPatch, PaymentStatus};

#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentRequest {
    pub fee_id: Uuid,
    pub schedule_id: Option<Uuid>,
    pub amount: Decimal,
    pub method: Option<PaymentMethod>,
    /// Defaults to today
    pub payment_date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 50))]
    pub check_number: Option<String>,
    pub check_due_date: Option<NaiveDate>,
    #[validate(length(max = 100))]
    pub transaction_ref: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub receipt_number: Option<String>,
    pub status: Option<PaymentStatus>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl RecordPaymentRequest {
    pub fn into_new_payment(self, today: NaiveDate) -> NewPayment {
        NewPayment {
            fee_id: FeeId::from_uuid(self.fee_id),
            schedule_id: self.schedule_id.map(ScheduleId::from_uuid),
            amount: Money::new(self.amount),
            method: self.method.unwrap_or(PaymentMethod::Cash),
            payment_date: self.payment_date.unwrap_or(today),
            check_number: self.check_number,
            check_due_date: self.check_due_date,
            transaction_ref: self.transaction_ref,
            receipt_number: self.receipt_number,
            status: self.status,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePaymentRequest {
    pub amount: Option<Decimal>,
    pub method: Option<PaymentMethod>,
    pub payment_date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 50))]
    pub check_number: Option<String>,
    pub check_due_date: Option<NaiveDate>,
    #[validate(length(max = 100))]
    pub transaction_ref: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub receipt_number: Option<String>,
    pub status: Option<PaymentStatus>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl From<UpdatePaymentRequest> for PaymentPatch {
    fn from(request: UpdatePaymentRequest) -> Self {
        PaymentPatch {
            amount: request.amount.map(Money::new),
            method: request.method,
            payment_date: request.payment_date,
            check_number: request.check_number,
            check_due_date: request.check_due_date,
            transaction_ref: request.transaction_ref,
            receipt_number: request.receipt_number,
            status: request.status,
            notes: request.notes,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub fee_id: Uuid,
    pub schedule_id: Option<Uuid>,
    pub student_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub payment_date: NaiveDate,
    pub check_number: Option<String>,
    pub check_due_date: Option<NaiveDate>,
    pub transaction_ref: Option<String>,
    pub receipt_number: String,
    pub status: PaymentStatus,
    pub processed_by: Uuid,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id.into(),
            fee_id: payment.fee_id.into(),
            schedule_id: payment.schedule_id.map(Into::into),
            student_id: payment.student_id.into(),
            amount: payment.amount.amount(),
            method: payment.method,
            payment_date: payment.payment_date,
            check_number: payment.check_number,
            check_due_date: payment.check_due_date,
            transaction_ref: payment.transaction_ref,
            receipt_number: payment.receipt_number,
            status: payment.status,
            processed_by: payment.processed_by.into(),
            notes: payment.notes,
            created_at: payment.created_at,
        }
    }
}
