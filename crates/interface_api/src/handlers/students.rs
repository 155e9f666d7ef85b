//! Student handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use core_kernel::StudentId;
use domain_fees::StudentFeeSummary;

use crate::dto::fees::FeeResponse;
use crate::dto::payments::PaymentResponse;
use crate::{error::ApiError, AppState};

pub async fn list_fees(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<FeeResponse>>, ApiError> {
    let fees = state.fees.fees_for_student(StudentId::from_uuid(id)).await?;
    Ok(Json(fees.into_iter().map(Into::into).collect()))
}

pub async fn list_payments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PaymentResponse>>, ApiError> {
    let payments = state
        .payments
        .payments_for_student(StudentId::from_uuid(id))
        .await?;
    Ok(Json(payments.into_iter().map(Into::into).collect()))
}

/// Totals and status counts over a student's fees
pub async fn summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StudentFeeSummary>, ApiError> {
    Ok(Json(state.fees.student_summary(StudentId::from_uuid(id)).await?))
}
