use std::collections::HashMap;
use std::sync::Arc;

use axum::http::HeaderMap;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::Serialize;
use tracing::instrument;

use crate::db::DbPool;
use crate::entities::activity_log::{self, ActionType};
use crate::entities::user;
use crate::errors::ServiceError;

/// A new audit trail entry. The timestamp is assigned at insert time.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: i32,
    pub action_type: ActionType,
    pub description: String,
    pub model_name: Option<String>,
    pub object_id: Option<i32>,
    pub ip_address: Option<String>,
}

/// Client address from X-Forwarded-For, if the proxy set one.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Append an entry to the activity log. Usable on a plain connection or
/// inside a transaction.
pub async fn record<C: ConnectionTrait>(
    conn: &C,
    entry: NewActivity,
) -> Result<activity_log::Model, ServiceError> {
    let model = activity_log::ActiveModel {
        user_id: Set(entry.user_id),
        action_type: Set(entry.action_type),
        model_name: Set(entry.model_name),
        object_id: Set(entry.object_id),
        description: Set(entry.description),
        timestamp: Set(Utc::now()),
        ip_address: Set(entry.ip_address),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(model)
}

/// UTC day window [start, end) for a calendar date.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    (start, start + Duration::days(1))
}

const DEFAULT_QUERY_LIMIT: u64 = 50;
const SUMMARY_RECENT_COUNT: usize = 10;

/// Filters for listing activity entries
#[derive(Debug, Default, Clone)]
pub struct ActivityQuery {
    /// Exact calendar date (UTC)
    pub date: Option<NaiveDate>,
    /// Case-insensitive username substring
    pub user: Option<String>,
    pub action: Option<ActionType>,
    pub limit: Option<u64>,
}

/// Activity entry joined with the acting user's name
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub id: i32,
    pub user_id: i32,
    pub username: Option<String>,
    pub action_type: ActionType,
    pub model_name: Option<String>,
    pub object_id: Option<i32>,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub ip_address: Option<String>,
}

impl ActivityEntry {
    fn from_joined(log: activity_log::Model, acting_user: Option<user::Model>) -> Self {
        Self {
            id: log.id,
            user_id: log.user_id,
            username: acting_user.map(|u| u.username),
            action_type: log.action_type,
            model_name: log.model_name,
            object_id: log.object_id,
            description: log.description,
            timestamp: log.timestamp,
            ip_address: log.ip_address,
        }
    }
}

/// Per-day activity rollup
#[derive(Debug, Serialize)]
pub struct ActivitySummary {
    pub date: NaiveDate,
    pub total_activities: u64,
    pub active_users: u64,
    pub action_breakdown: HashMap<String, u64>,
    pub user_breakdown: HashMap<String, u64>,
    pub recent: Vec<ActivityEntry>,
}

/// Service for querying the append-only activity log
#[derive(Clone)]
pub struct ActivityService {
    db_pool: Arc<DbPool>,
}

impl ActivityService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Append an entry
    #[instrument(skip(self))]
    pub async fn record(&self, entry: NewActivity) -> Result<activity_log::Model, ServiceError> {
        record(&*self.db_pool, entry).await
    }

    /// Filtered listing, newest first
    #[instrument(skip(self))]
    pub async fn list(&self, query: ActivityQuery) -> Result<Vec<ActivityEntry>, ServiceError> {
        let mut select = activity_log::Entity::find()
            .find_also_related(user::Entity)
            .order_by_desc(activity_log::Column::Timestamp);

        if let Some(date) = query.date {
            let (start, end) = day_bounds(date);
            select = select
                .filter(activity_log::Column::Timestamp.gte(start))
                .filter(activity_log::Column::Timestamp.lt(end));
        }
        if let Some(action) = query.action {
            select = select.filter(activity_log::Column::ActionType.eq(action));
        }
        if let Some(fragment) = query.user.as_deref().filter(|s| !s.is_empty()) {
            select = select.filter(user::Column::Username.contains(fragment));
        }

        let limit = query.limit.unwrap_or(DEFAULT_QUERY_LIMIT);
        let rows = select.limit(limit).all(&*self.db_pool).await?;

        Ok(rows
            .into_iter()
            .map(|(log, acting_user)| ActivityEntry::from_joined(log, acting_user))
            .collect())
    }

    /// Daily rollup: totals, per-action and per-user breakdowns, and the
    /// most recent entries. Aggregated in memory over the day window.
    #[instrument(skip(self))]
    pub async fn daily_summary(
        &self,
        date: Option<NaiveDate>,
    ) -> Result<ActivitySummary, ServiceError> {
        let date = date.unwrap_or_else(|| Utc::now().date_naive());
        let (start, end) = day_bounds(date);

        let rows = activity_log::Entity::find()
            .find_also_related(user::Entity)
            .filter(activity_log::Column::Timestamp.gte(start))
            .filter(activity_log::Column::Timestamp.lt(end))
            .order_by_desc(activity_log::Column::Timestamp)
            .all(&*self.db_pool)
            .await?;

        let entries: Vec<ActivityEntry> = rows
            .into_iter()
            .map(|(log, acting_user)| ActivityEntry::from_joined(log, acting_user))
            .collect();

        let mut action_breakdown: HashMap<String, u64> = HashMap::new();
        let mut user_breakdown: HashMap<String, u64> = HashMap::new();
        let mut user_ids: Vec<i32> = Vec::new();
        for entry in &entries {
            *action_breakdown
                .entry(entry.action_type.to_string())
                .or_default() += 1;
            let name = entry
                .username
                .clone()
                .unwrap_or_else(|| format!("user#{}", entry.user_id));
            *user_breakdown.entry(name).or_default() += 1;
            if !user_ids.contains(&entry.user_id) {
                user_ids.push(entry.user_id);
            }
        }

        Ok(ActivitySummary {
            date,
            total_activities: entries.len() as u64,
            active_users: user_ids.len() as u64,
            action_breakdown,
            user_breakdown,
            recent: entries.into_iter().take(SUMMARY_RECENT_COUNT).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn day_bounds_cover_exactly_one_day() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let (start, end) = day_bounds(date);
        assert_eq!(start.to_rfc3339(), "2024-03-15T00:00:00+00:00");
        assert_eq!(end - start, Duration::days(1));
    }

    #[test]
    fn client_ip_takes_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers), Some("203.0.113.7".to_string()));
    }

    #[test]
    fn client_ip_absent_without_header() {
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }
}
