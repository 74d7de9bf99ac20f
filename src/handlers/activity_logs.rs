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
use crate::entities::activity_log::ActionType;
use crate::errors::ApiError;
use crate::handlers::AppState;
use crate::services::activity::ActivityQuery;

pub fn activity_log_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_activity))
        .route("/summary", get(daily_summary))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListActivityQuery {
    pub date: Option<NaiveDate>,
    /// Username substring
    pub user: Option<String>,
    pub action: Option<ActionType>,
    pub limit: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    /// Defaults to today (UTC)
    pub date: Option<NaiveDate>,
}

async fn list_activity(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListActivityQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state
        .services
        .activity
        .list(ActivityQuery {
            date: query.date,
            user: query.user,
            action: query.action,
            limit: query.limit,
        })
        .await
        .map_err(map_service_error)?;
    Ok(success_response(entries))
}

async fn daily_summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SummaryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state
        .services
        .activity
        .daily_summary(query.date)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(summary))
}
