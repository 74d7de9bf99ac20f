use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
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
use crate::entities::purchase_order::PoStatus;
use crate::errors::ApiError;
use crate::handlers::AppState;
use crate::services::purchase_orders::{
    CreatePurchaseOrder, CreatePurchaseOrderItem, UpdatePurchaseOrder,
};

pub fn purchase_order_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_order))
        .route("/", get(list_orders))
        .route("/:id", get(get_order))
        .route("/:id", put(update_order))
        .route("/:id", delete(delete_order))
}

#[derive(Debug, Deserialize, Validate)]
pub struct PurchaseOrderItemRequest {
    #[validate(length(min = 1, max = 255))]
    pub medicine_name: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePurchaseOrderRequest {
    pub supplier_id: i32,
    pub expected_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
    pub total_amount: Option<Decimal>,
    #[validate]
    pub items: Vec<PurchaseOrderItemRequest>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePurchaseOrderRequest {
    pub status: Option<PoStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub expected_delivery: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    pub total_amount: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<PoStatus>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Json(payload): Json<CreatePurchaseOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let order = state
        .services
        .purchase_orders
        .create_order(CreatePurchaseOrder {
            supplier_id: payload.supplier_id,
            expected_delivery: payload.expected_delivery,
            notes: payload.notes,
            total_amount: payload.total_amount,
            items: payload
                .items
                .into_iter()
                .map(|line| CreatePurchaseOrderItem {
                    medicine_name: line.medicine_name,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
                .collect(),
        })
        .await
        .map_err(map_service_error)?;

    record_activity(
        &state,
        &auth_user,
        &headers,
        ActivityContext {
            action_type: ActionType::Create,
            model_name: "purchase_order",
            object_id: Some(order.order.id),
            description: format!(
                "Created purchase order {} for supplier {}",
                order.order.id, order.order.supplier_id
            ),
        },
    )
    .await;

    Ok(created_response(order))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state
        .services
        .purchase_orders
        .list_orders(query.status)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(orders))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .purchase_orders
        .get_order(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

async fn update_order(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(payload): Json<UpdatePurchaseOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let order = state
        .services
        .purchase_orders
        .update_order(
            id,
            UpdatePurchaseOrder {
                status: payload.status,
                expected_delivery: payload.expected_delivery,
                notes: payload.notes,
                total_amount: payload.total_amount,
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
            model_name: "purchase_order",
            object_id: Some(id),
            description: format!("Updated purchase order {}", id),
        },
    )
    .await;

    Ok(success_response(order))
}

async fn delete_order(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .purchase_orders
        .delete_order(id)
        .await
        .map_err(map_service_error)?;

    record_activity(
        &state,
        &auth_user,
        &headers,
        ActivityContext {
            action_type: ActionType::Delete,
            model_name: "purchase_order",
            object_id: Some(id),
            description: format!("Deleted purchase order {}", id),
        },
    )
    .await;

    Ok(no_content_response())
}
