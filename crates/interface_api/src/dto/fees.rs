//! Fee DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{AcademicYear, FeeTypeId, Money, StudentId};
use domain_fees::{
    Cadence, Fee, FeeBalance, FeeDetails, FeeFilter, FeePatch, FeeSpec, FeeStats, FeeStatus, NewFee, PaymentSchedule,
    ScheduleStatus,
};

use crate::dto::payments::PaymentResponse;
use crate::error::ApiError;

/// `GET /fees` filters; both are optional
#[derive(Debug, Default, Deserialize)]
pub struct ListFeesParams {
    pub status: Option<FeeStatus>,
    /// Label such as `2025-2026`
    pub academic_year: Option<String>,
}

impl ListFeesParams {
    pub fn to_filter(&self) -> Result<FeeFilter, ApiError> {
        let academic_year = self
            .academic_year
            .as_deref()
            .map(|label| {
                label
                    .parse::<AcademicYear>()
                    .map_err(|e| ApiError::BadRequest(e.to_string()))
            })
            .transpose()?;
        Ok(FeeFilter {
            status: self.status,
            academic_year,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFeeRequest {
    pub student_id: Uuid,
    pub fee_type_id: Uuid,
    pub cadence: Cadence,
    pub discount_amount: Option<Decimal>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl From<CreateFeeRequest> for NewFee {
    fn from(request: CreateFeeRequest) -> Self {
        NewFee {
            student_id: StudentId::from_uuid(request.student_id),
            fee_type_id: FeeTypeId::from_uuid(request.fee_type_id),
            cadence: request.cadence,
            discount_amount: request.discount_amount.map(Money::new),
            notes: request.notes,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct FeeSpecRequest {
    pub fee_type_id: Uuid,
    pub cadence: Cadence,
    pub discount_amount: Option<Decimal>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl From<FeeSpecRequest> for FeeSpec {
    fn from(request: FeeSpecRequest) -> Self {
        FeeSpec {
            fee_type_id: FeeTypeId::from_uuid(request.fee_type_id),
            cadence: request.cadence,
            discount_amount: request.discount_amount.map(Money::new),
            notes: request.notes,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct BulkCreateFeesRequest {
    pub student_id: Uuid,
    #[validate(length(min = 1, max = 50), nested)]
    pub fees: Vec<FeeSpecRequest>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateFeeRequest {
    pub fee_type_id: Option<Uuid>,
    pub cadence: Option<Cadence>,
    pub discount_amount: Option<Decimal>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl From<UpdateFeeRequest> for FeePatch {
    fn from(request: UpdateFeeRequest) -> Self {
        FeePatch {
            fee_type_id: request.fee_type_id.map(FeeTypeId::from_uuid),
            cadence: request.cadence,
            discount_amount: request.discount_amount.map(Money::new),
            notes: request.notes,
        }
    }
}

/// `?start=YYYY-MM-DD` for schedule generation; defaults to today
#[derive(Debug, Default, Deserialize)]
pub struct ScheduleStartQuery {
    pub start: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct FeeResponse {
    pub id: Uuid,
    pub student_id: Uuid,
    pub fee_type_id: Uuid,
    pub academic_year: String,
    pub cadence: Cadence,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub net_amount: Decimal,
    pub paid_amount: Decimal,
    pub remaining: Decimal,
    pub status: FeeStatus,
    pub notes: Option<String>,
    pub assigned_by: Uuid,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Fee> for FeeResponse {
    fn from(fee: Fee) -> Self {
        Self {
            id: fee.id.into(),
            student_id: fee.student_id.into(),
            fee_type_id: fee.fee_type_id.into(),
            academic_year: fee.academic_year.to_string(),
            cadence: fee.cadence,
            total_amount: fee.total_amount.amount(),
            discount_amount: fee.discount_amount.amount(),
            net_amount: fee.net_amount().amount(),
            paid_amount: fee.paid_amount.amount(),
            remaining: fee.remaining().amount(),
            status: fee.status,
            notes: fee.notes,
            assigned_by: fee.assigned_by.into(),
            version: fee.version,
            created_at: fee.created_at,
            updated_at: fee.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub id: Uuid,
    pub fee_id: Uuid,
    pub installment: u32,
    pub due_date: NaiveDate,
    pub amount: Decimal,
    pub paid_amount: Decimal,
    pub remaining: Decimal,
    pub status: ScheduleStatus,
}

impl From<PaymentSchedule> for ScheduleResponse {
    fn from(schedule: PaymentSchedule) -> Self {
        Self {
            id: schedule.id.into(),
            fee_id: schedule.fee_id.into(),
            installment: schedule.installment,
            due_date: schedule.due_date,
            amount: schedule.amount.amount(),
            paid_amount: schedule.paid_amount.amount(),
            remaining: schedule.remaining().amount(),
            status: schedule.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FeeDetailsResponse {
    pub fee: FeeResponse,
    pub balance: FeeBalance,
    pub schedules: Vec<ScheduleResponse>,
    pub payments: Vec<PaymentResponse>,
    pub stats: FeeStats,
}

impl From<FeeDetails> for FeeDetailsResponse {
    fn from(details: FeeDetails) -> Self {
        Self {
            fee: details.fee.into(),
            balance: details.balance,
            schedules: details.schedules.into_iter().map(Into::into).collect(),
            payments: details.payments.into_iter().map(Into::into).collect(),
            stats: details.stats,
        }
    }
}
