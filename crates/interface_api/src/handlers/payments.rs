//! Payment handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{Clock, PaymentId};

use crate::auth::CurrentUser;
use crate::dto::payments::*;
use crate::{error::ApiError, AppState};

/// Records a payment against a fee and, optionally, one of its installments
pub async fn record_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError> {
    request.validate()?;
    let payment = state
        .payments
        .record(request.into_new_payment(state.clock.today()), user)
        .await?;
    Ok((StatusCode::CREATED, Json(payment.into())))
}

pub async fn list_payments(State(state): State<AppState>) -> Result<Json<Vec<PaymentResponse>>, ApiError> {
    let payments = state.payments.list_payments().await?;
    Ok(Json(payments.into_iter().map(Into::into).collect()))
}

pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let payment = state.payments.get_payment(PaymentId::from_uuid(id)).await?;
    Ok(Json(payment.into()))
}

/// Updates a payment, adjusting balances by the change in its contribution
pub async fn update_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePaymentRequest>,
) -> Result<Json<PaymentResponse>, ApiError> {
    request.validate()?;
    let payment = state
        .payments
        .update(PaymentId::from_uuid(id), request.into())
        .await?;
    Ok(Json(payment.into()))
}

/// Deletes a payment and reverses its contribution
pub async fn delete_payment(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    state.payments.delete(PaymentId::from_uuid(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
