use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

use super::common::{map_service_error, success_response};
use crate::errors::ApiError;
use crate::handlers::AppState;

pub fn report_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sales/daily", get(daily_sales))
        .route("/sales/monthly", get(monthly_sales))
}

#[derive(Debug, Deserialize)]
pub struct DailyQuery {
    /// Defaults to today (UTC)
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct MonthlyQuery {
    /// Defaults to the current year
    pub year: Option<i32>,
    /// Defaults to the current month
    pub month: Option<u32>,
}

async fn daily_sales(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DailyQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .services
        .sales
        .daily_report(query.date)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(report))
}

async fn monthly_sales(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MonthlyQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .services
        .sales
        .monthly_report(query.year, query.month)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(report))
}
