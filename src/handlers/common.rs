use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;
use validator::Validate;

use crate::auth::AuthUser;
use crate::entities::activity_log::ActionType;
use crate::errors::{ApiError, ServiceError};
use crate::handlers::AppState;
use crate::services::activity::{client_ip, NewActivity};

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ApiError> {
    input
        .validate()
        .map_err(|e| ApiError::ValidationError(format!("Validation failed: {}", e)))
}

/// Map service errors to API errors
pub fn map_service_error(err: ServiceError) -> ApiError {
    ApiError::ServiceError(err)
}

/// Deserializer for nullable PATCH-style fields: an absent field stays
/// `None`, an explicit `null` becomes `Some(None)`, a value `Some(Some(_))`.
/// Pair with `#[serde(default, deserialize_with = "double_option")]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Describes one auditable mutation for the activity trail
pub struct ActivityContext<'a> {
    pub action_type: ActionType,
    pub model_name: &'a str,
    pub object_id: Option<i32>,
    pub description: String,
}

/// Append to the activity log without failing the request that triggered it
pub async fn record_activity(
    state: &AppState,
    auth_user: &AuthUser,
    headers: &HeaderMap,
    ctx: ActivityContext<'_>,
) {
    let entry = NewActivity {
        user_id: auth_user.user_id,
        action_type: ctx.action_type,
        description: ctx.description,
        model_name: Some(ctx.model_name.to_string()),
        object_id: ctx.object_id,
        ip_address: client_ip(headers),
    };
    if let Err(e) = state.services.activity.record(entry).await {
        warn!(error = %e, "failed to record activity entry");
    }
}
