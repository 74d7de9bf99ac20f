use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get, put},
    Router,
};

use super::common::{map_service_error, success_response};
use crate::auth::AuthUser;
use crate::errors::ApiError;
use crate::handlers::AppState;

/// Notification routes; every operation is scoped to the caller's own rows.
pub fn notification_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/recent", get(recent))
        .route("/read-all", put(mark_all_read))
        .route("/read", delete(delete_read))
        .route("/:id/read", put(mark_read))
}

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let notifications = state
        .services
        .notifications
        .list_for_user(auth_user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(notifications))
}

async fn unread_count(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let count = state
        .services
        .notifications
        .unread_count(auth_user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({ "unread": count })))
}

async fn recent(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let notifications = state
        .services
        .notifications
        .recent(auth_user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(notifications))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let notification = state
        .services
        .notifications
        .mark_read(auth_user.user_id, id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(notification))
}

async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .services
        .notifications
        .mark_all_read(auth_user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({ "updated": updated })))
}

async fn delete_read(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .services
        .notifications
        .delete_read(auth_user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({ "deleted": deleted })))
}
