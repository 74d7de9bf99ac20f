use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use super::common::{
    created_response, double_option, map_service_error, no_content_response, record_activity,
    success_response, validate_input, ActivityContext,
};
use crate::auth::AuthUser;
use crate::entities::activity_log::ActionType;
use crate::errors::ApiError;
use crate::handlers::AppState;
use crate::services::catalog::{CreateMedicine, UpdateMedicine};

pub fn medicine_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_medicine))
        .route("/", get(list_medicines))
        .route("/expired", get(list_expired))
        .route("/:id", get(get_medicine))
        .route("/:id", put(update_medicine))
        .route("/:id", delete(delete_medicine))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMedicineRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    pub price: Decimal,
    pub quantity: i32,
    pub batch_number: Option<String>,
    pub expiration_date: NaiveDate,
    pub supplier_id: Option<i32>,
    pub reorder_level: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateMedicineRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    /// Absent leaves the value unchanged; null clears it
    #[serde(default, deserialize_with = "double_option")]
    pub batch_number: Option<Option<String>>,
    pub expiration_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    pub supplier_id: Option<Option<i32>>,
}

/// Create a medicine; its inventory item is provisioned in the same
/// transaction.
async fn create_medicine(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Json(payload): Json<CreateMedicineRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let (medicine, inventory) = state
        .services
        .catalog
        .create_medicine(CreateMedicine {
            name: payload.name,
            category: payload.category,
            price: payload.price,
            quantity: payload.quantity,
            batch_number: payload.batch_number,
            expiration_date: payload.expiration_date,
            supplier_id: payload.supplier_id,
            reorder_level: payload.reorder_level,
        })
        .await
        .map_err(map_service_error)?;

    record_activity(
        &state,
        &auth_user,
        &headers,
        ActivityContext {
            action_type: ActionType::Create,
            model_name: "medicine",
            object_id: Some(medicine.id),
            description: format!("Created medicine '{}'", medicine.name),
        },
    )
    .await;

    Ok(created_response(serde_json::json!({
        "medicine": medicine,
        "inventory": inventory,
    })))
}

async fn list_medicines(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let medicines = state
        .services
        .catalog
        .list_medicines()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(medicines))
}

/// Medicines past their expiration date
async fn list_expired(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let medicines = state
        .services
        .catalog
        .list_expired()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(medicines))
}

async fn get_medicine(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let medicine = state
        .services
        .catalog
        .get_medicine(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(medicine))
}

async fn update_medicine(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateMedicineRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let medicine = state
        .services
        .catalog
        .update_medicine(
            id,
            UpdateMedicine {
                name: payload.name,
                category: payload.category,
                price: payload.price,
                batch_number: payload.batch_number,
                expiration_date: payload.expiration_date,
                supplier_id: payload.supplier_id,
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
            model_name: "medicine",
            object_id: Some(medicine.id),
            description: format!("Updated medicine '{}'", medicine.name),
        },
    )
    .await;

    Ok(success_response(medicine))
}

async fn delete_medicine(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .catalog
        .delete_medicine(id)
        .await
        .map_err(map_service_error)?;

    record_activity(
        &state,
        &auth_user,
        &headers,
        ActivityContext {
            action_type: ActionType::Delete,
            model_name: "medicine",
            object_id: Some(id),
            description: format!("Deleted medicine {}", id),
        },
    )
    .await;

    Ok(no_content_response())
}
