use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use validator::Validate;

use super::common::{
    map_service_error, no_content_response, record_activity, success_response, validate_input,
    ActivityContext,
};
use crate::auth::AuthUser;
use crate::entities::activity_log::ActionType;
use crate::errors::ApiError;
use crate::handlers::AppState;
use crate::services::inventory::{StockLevel, UpdateInventoryItem};

pub fn inventory_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_items))
        .route("/low-stock", get(low_stock))
        .route("/stats", get(stats))
        .route("/restock", post(restock))
        .route("/decrement", post(decrement))
        .route("/medicine/:medicine_id", get(get_by_medicine))
        .route("/:id", get(get_item))
        .route("/:id", put(update_item))
        .route("/:id", delete(delete_item))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateInventoryRequest {
    pub current_stock: Option<i32>,
    pub reorder_level: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct StockMutationRequest {
    pub medicine_id: i32,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

async fn list_items(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let items = state
        .services
        .inventory
        .list_items()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(items))
}

/// Items at or below their reorder level
async fn low_stock(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let items = state
        .services
        .inventory
        .get_low_stock()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(items))
}

async fn stats(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let stats = state
        .services
        .inventory
        .stats()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(stats))
}

async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state
        .services
        .inventory
        .get_item(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(item))
}

async fn get_by_medicine(
    State(state): State<Arc<AppState>>,
    Path(medicine_id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state
        .services
        .inventory
        .get_item_by_medicine(medicine_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(item))
}

/// Direct edit of stock and reorder level. A resulting breach raises
/// low-stock alerts after the write.
async fn update_item(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateInventoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let item = state
        .services
        .inventory
        .update_item(
            id,
            UpdateInventoryItem {
                current_stock: payload.current_stock,
                reorder_level: payload.reorder_level,
            },
        )
        .await
        .map_err(map_service_error)?;

    state
        .services
        .notifications
        .notify_low_stock_best_effort(StockLevel {
            medicine_id: item.medicine_id,
            new_stock: item.current_stock,
            reorder_level: item.reorder_level,
        })
        .await;

    record_activity(
        &state,
        &auth_user,
        &headers,
        ActivityContext {
            action_type: ActionType::StockUpdate,
            model_name: "inventory_item",
            object_id: Some(item.id),
            description: format!(
                "Set stock of medicine {} to {}",
                item.medicine_id, item.current_stock
            ),
        },
    )
    .await;

    Ok(success_response(item))
}

async fn delete_item(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .inventory
        .delete_item(id)
        .await
        .map_err(map_service_error)?;

    record_activity(
        &state,
        &auth_user,
        &headers,
        ActivityContext {
            action_type: ActionType::Delete,
            model_name: "inventory_item",
            object_id: Some(id),
            description: format!("Deleted inventory item {}", id),
        },
    )
    .await;

    Ok(no_content_response())
}

/// Add stock, for deliveries
async fn restock(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Json(payload): Json<StockMutationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let level = state
        .services
        .inventory
        .restock(payload.medicine_id, payload.quantity)
        .await
        .map_err(map_service_error)?;

    record_activity(
        &state,
        &auth_user,
        &headers,
        ActivityContext {
            action_type: ActionType::StockUpdate,
            model_name: "inventory_item",
            object_id: Some(level.medicine_id),
            description: format!(
                "Restocked medicine {} by {} (now {})",
                level.medicine_id, payload.quantity, level.new_stock
            ),
        },
    )
    .await;

    Ok(success_response(level))
}

/// Subtract stock outside a sale (spoilage, expiry write-offs).
/// Overdrafts are rejected atomically.
async fn decrement(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Json(payload): Json<StockMutationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let level = state
        .services
        .inventory
        .decrement_stock(payload.medicine_id, payload.quantity)
        .await
        .map_err(map_service_error)?;

    state
        .services
        .notifications
        .notify_low_stock_best_effort(level)
        .await;

    record_activity(
        &state,
        &auth_user,
        &headers,
        ActivityContext {
            action_type: ActionType::StockUpdate,
            model_name: "inventory_item",
            object_id: Some(level.medicine_id),
            description: format!(
                "Decremented medicine {} by {} (now {})",
                level.medicine_id, payload.quantity, level.new_stock
            ),
        },
    )
    .await;

    Ok(success_response(level))
}
