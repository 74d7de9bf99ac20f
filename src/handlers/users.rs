use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{delete, get, put},
    Router,
};
use serde::Deserialize;
use validator::Validate;

use super::common::{
    map_service_error, no_content_response, record_activity, success_response, validate_input,
    ActivityContext,
};
use crate::auth::policy::{role_allows, Capabilities};
use crate::auth::AuthUser;
use crate::entities::activity_log::ActionType;
use crate::entities::user::Role;
use crate::errors::{ApiError, ServiceError};
use crate::handlers::AppState;
use crate::services::users::UpdateUser;

pub fn user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_users))
        .route("/:id", get(get_user))
        .route("/:id", put(update_user))
        .route("/:id", delete(delete_user))
}

fn can_manage(auth_user: &AuthUser) -> bool {
    role_allows(Capabilities::USERS_MANAGEMENT, auth_user.role)
}

fn require_management(auth_user: &AuthUser) -> Result<(), ApiError> {
    if can_manage(auth_user) {
        return Ok(());
    }
    Err(ApiError::ServiceError(ServiceError::Forbidden(
        "administrator rights required".to_string(),
    )))
}

/// Non-admins may only touch their own profile
fn require_self_or_management(auth_user: &AuthUser, id: i32) -> Result<(), ApiError> {
    if auth_user.user_id == id {
        return Ok(());
    }
    require_management(auth_user)
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 3, max = 150))]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    require_management(&auth_user)?;

    let users = state
        .services
        .users
        .list_users()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(users))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    require_self_or_management(&auth_user, id)?;

    let user = state
        .services
        .users
        .get_user(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(user))
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    require_self_or_management(&auth_user, id)?;

    // Role and account-status changes stay with user management
    if (payload.role.is_some() || payload.is_active.is_some()) && !can_manage(&auth_user) {
        return Err(ApiError::ServiceError(ServiceError::Forbidden(
            "only administrators can change roles or account status".to_string(),
        )));
    }

    let user = state
        .services
        .users
        .update_user(
            id,
            UpdateUser {
                username: payload.username,
                email: payload.email,
                role: payload.role,
                is_active: payload.is_active,
            },
        )
        .await
        .map_err(map_service_error)?;

    record_activity(
        &state,
        &auth_user,
        &headers,
        ActivityContext {
            action_type: ActionType::Update,
            model_name: "user",
            object_id: Some(user.id),
            description: format!("Updated user '{}'", user.username),
        },
    )
    .await;

    Ok(success_response(user))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    require_management(&auth_user)?;
    if auth_user.user_id == id {
        return Err(ApiError::BadRequest(
            "cannot delete your own account".to_string(),
        ));
    }

    state
        .services
        .users
        .delete_user(id)
        .await
        .map_err(map_service_error)?;

    record_activity(
        &state,
        &auth_user,
        &headers,
        ActivityContext {
            action_type: ActionType::Delete,
            model_name: "user",
            object_id: Some(id),
            description: format!("Deleted user {}", id),
        },
    )
    .await;

    Ok(no_content_response())
}
