//! Fee handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{FeeId, StudentId};
use domain_fees::FeeBalance;

use crate::auth::CurrentUser;
use crate::dto::fees::*;
use crate::dto::payments::PaymentResponse;
use crate::{error::ApiError, AppState};

/// Lists fees, optionally filtered by status and academic year
pub async fn list_fees(
    State(state): State<AppState>,
    Query(params): Query<ListFeesParams>,
) -> Result<Json<Vec<FeeResponse>>, ApiError> {
    let fees = state.fees.list_fees(params.to_filter()?).await?;
    Ok(Json(fees.into_iter().map(Into::into).collect()))
}

/// Assigns a fee to a student for the current academic year
pub async fn create_fee(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateFeeRequest>,
) -> Result<(StatusCode, Json<FeeResponse>), ApiError> {
    request.validate()?;
    let fee = state.fees.create_fee(request.into(), user).await?;
    Ok((StatusCode::CREATED, Json(fee.into())))
}

/// Assigns several fees to one student, all or nothing
pub async fn create_fees_bulk(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<BulkCreateFeesRequest>,
) -> Result<(StatusCode, Json<Vec<FeeResponse>>), ApiError> {
    request.validate()?;
    let specs = request.fees.into_iter().map(Into::into).collect();
    let fees = state
        .fees
        .create_fees_bulk(StudentId::from_uuid(request.student_id), specs, user)
        .await?;
    Ok((StatusCode::CREATED, Json(fees.into_iter().map(Into::into).collect())))
}

/// Gets a fee with its installments, payments and derived figures
pub async fn get_fee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FeeDetailsResponse>, ApiError> {
    let details = state.fees.get_fee_details(FeeId::from_uuid(id)).await?;
    Ok(Json(details.into()))
}

/// Edits a fee, regenerating its plan when amounts or cadence change
pub async fn update_fee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateFeeRequest>,
) -> Result<Json<FeeResponse>, ApiError> {
    request.validate()?;
    let fee = state.fees.update_fee(FeeId::from_uuid(id), request.into()).await?;
    Ok(Json(fee.into()))
}

/// Deletes a fee that has no payments
pub async fn delete_fee(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    state.fees.delete_fee(FeeId::from_uuid(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn cancel_fee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FeeResponse>, ApiError> {
    let fee = state.fees.cancel_fee(FeeId::from_uuid(id)).await?;
    Ok(Json(fee.into()))
}

pub async fn get_balance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FeeBalance>, ApiError> {
    Ok(Json(state.fees.get_fee_balance(FeeId::from_uuid(id)).await?))
}

/// Unpaid installments past their due date, earliest first
pub async fn list_overdue_schedules(
    State(state): State<AppState>,
) -> Result<Json<Vec<ScheduleResponse>>, ApiError> {
    let schedules = state.fees.overdue_schedules().await?;
    Ok(Json(schedules.into_iter().map(Into::into).collect()))
}

pub async fn list_schedules(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ScheduleResponse>>, ApiError> {
    let plan = state.fees.schedules_for_fee(FeeId::from_uuid(id)).await?;
    Ok(Json(plan.into_iter().map(Into::into).collect()))
}

/// Generates the installment plan; refused if one already exists
pub async fn generate_schedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ScheduleStartQuery>,
) -> Result<(StatusCode, Json<Vec<ScheduleResponse>>), ApiError> {
    let fee_id = FeeId::from_uuid(id);
    let plan = match query.start {
        Some(start) => state.fees.generate_schedule_from(fee_id, start).await?,
        None => state.fees.generate_schedule(fee_id).await?,
    };
    Ok((StatusCode::CREATED, Json(plan.into_iter().map(Into::into).collect())))
}

/// Replaces the installment plan; refused once an installment has been paid
pub async fn regenerate_schedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ScheduleStartQuery>,
) -> Result<Json<Vec<ScheduleResponse>>, ApiError> {
    let plan = state
        .fees
        .regenerate_schedule(FeeId::from_uuid(id), query.start)
        .await?;
    Ok(Json(plan.into_iter().map(Into::into).collect()))
}

pub async fn list_payments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PaymentResponse>>, ApiError> {
    let payments = state.payments.payments_for_fee(FeeId::from_uuid(id)).await?;
    Ok(Json(payments.into_iter().map(Into::into).collect()))
}
