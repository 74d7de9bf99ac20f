use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use validator::Validate;

use super::common::{
    created_response, double_option, map_service_error, record_activity, success_response,
    validate_input, ActivityContext,
};
use crate::auth::AuthUser;
use crate::entities::activity_log::ActionType;
use crate::errors::ApiError;
use crate::handlers::AppState;
use crate::services::suppliers::{CreateSupplier, UpdateSupplier};

pub fn supplier_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_supplier))
        .route("/", get(list_suppliers))
        .route("/:id", get(get_supplier))
        .route("/:id", put(update_supplier))
        .route("/:id", delete(deactivate_supplier))
        .route("/:id/reactivate", post(reactivate_supplier))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSupplierRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub contact_info: Option<String>,
    pub address: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateSupplierRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub contact_info: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListSuppliersQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

async fn create_supplier(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Json(payload): Json<CreateSupplierRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let supplier = state
        .services
        .suppliers
        .create_supplier(CreateSupplier {
            name: payload.name,
            contact_info: payload.contact_info,
            address: payload.address,
            email: payload.email,
            phone: payload.phone,
        })
        .await
        .map_err(map_service_error)?;

    record_activity(
        &state,
        &auth_user,
        &headers,
        ActivityContext {
            action_type: ActionType::Create,
            model_name: "supplier",
            object_id: Some(supplier.id),
            description: format!("Created supplier '{}'", supplier.name),
        },
    )
    .await;

    Ok(created_response(supplier))
}

async fn list_suppliers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListSuppliersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let suppliers = state
        .services
        .suppliers
        .list_suppliers(query.include_inactive)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(suppliers))
}

async fn get_supplier(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let supplier = state
        .services
        .suppliers
        .get_supplier(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(supplier))
}

async fn update_supplier(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateSupplierRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let supplier = state
        .services
        .suppliers
        .update_supplier(
            id,
            UpdateSupplier {
                name: payload.name,
                contact_info: payload.contact_info,
                address: payload.address,
                email: payload.email,
                phone: payload.phone,
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
            model_name: "supplier",
            object_id: Some(supplier.id),
            description: format!("Updated supplier '{}'", supplier.name),
        },
    )
    .await;

    Ok(success_response(supplier))
}

/// Soft delete: the supplier is deactivated, not removed
async fn deactivate_supplier(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let supplier = state
        .services
        .suppliers
        .deactivate_supplier(id)
        .await
        .map_err(map_service_error)?;

    record_activity(
        &state,
        &auth_user,
        &headers,
        ActivityContext {
            action_type: ActionType::Delete,
            model_name: "supplier",
            object_id: Some(id),
            description: format!("Deactivated supplier '{}'", supplier.name),
        },
    )
    .await;

    Ok(success_response(supplier))
}

async fn reactivate_supplier(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let supplier = state
        .services
        .suppliers
        .reactivate_supplier(id)
        .await
        .map_err(map_service_error)?;

    record_activity(
        &state,
        &auth_user,
        &headers,
        ActivityContext {
            action_type: ActionType::Update,
            model_name: "supplier",
            object_id: Some(id),
            description: format!("Reactivated supplier '{}'", supplier.name),
        },
    )
    .await;

    Ok(success_response(supplier))
}
