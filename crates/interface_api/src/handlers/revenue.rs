//! Revenue handlers

use axum::{
    extract::{Query, State},
    Json,
};

use crate::dto::revenue::{RevenueParams, RevenueResponse};
use crate::{error::ApiError, AppState};

/// Sums completed payments by date range, academic year or all time
pub async fn get_revenue(
    State(state): State<AppState>,
    Query(params): Query<RevenueParams>,
) -> Result<Json<RevenueResponse>, ApiError> {
    let total = state.revenue.revenue(params.to_query()?).await?;
    Ok(Json(RevenueResponse { total: total.amount() }))
}
