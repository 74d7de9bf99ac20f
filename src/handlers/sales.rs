use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use super::common::{
    created_response, map_service_error, no_content_response, record_activity, success_response,
    validate_input, ActivityContext,
};
use crate::auth::AuthUser;
use crate::entities::activity_log::ActionType;
use crate::entities::sale::PaymentMethod;
use crate::errors::ApiError;
use crate::handlers::AppState;
use crate::services::invoicing::InvoiceFormat;
use crate::services::sales::{CreateSale, CreateSaleItem, UpdateSale};

pub fn sale_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_sale))
        .route("/", get(list_sales))
        .route("/:id", get(get_sale))
        .route("/:id", put(update_sale))
        .route("/:id", delete(delete_sale))
        .route("/:id/invoice", get(sale_invoice))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SaleItemRequest {
    pub medicine_id: i32,
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Optional override; defaults to the catalog price
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSaleRequest {
    #[validate(length(min = 1, max = 255))]
    pub customer_name: String,
    pub discount: Option<Decimal>,
    pub payment_method: PaymentMethod,
    pub total_amount: Option<Decimal>,
    #[validate]
    pub items: Vec<SaleItemRequest>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateSaleRequest {
    pub customer_name: Option<String>,
    pub discount: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceQuery {
    pub format: Option<String>,
}

/// Record a sale. Stock for every line is decremented in the same
/// transaction; low-stock alerts go out only after commit.
async fn create_sale(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Json(payload): Json<CreateSaleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let outcome = state
        .services
        .sales
        .create_sale(CreateSale {
            customer_name: payload.customer_name,
            discount: payload.discount,
            payment_method: payload.payment_method,
            total_amount: payload.total_amount,
            items: payload
                .items
                .into_iter()
                .map(|line| CreateSaleItem {
                    medicine_id: line.medicine_id,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
                .collect(),
        })
        .await
        .map_err(map_service_error)?;

    for level in &outcome.breaches {
        state
            .services
            .notifications
            .notify_low_stock_best_effort(*level)
            .await;
    }

    record_activity(
        &state,
        &auth_user,
        &headers,
        ActivityContext {
            action_type: ActionType::Sale,
            model_name: "sale",
            object_id: Some(outcome.sale.sale.id),
            description: format!(
                "Recorded sale {} for '{}'",
                outcome.sale.sale.id, outcome.sale.sale.customer_name
            ),
        },
    )
    .await;

    Ok(created_response(outcome.sale))
}

async fn list_sales(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let sales = state
        .services
        .sales
        .list_sales()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(sales))
}

async fn get_sale(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let sale = state
        .services
        .sales
        .get_sale(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(sale))
}

async fn update_sale(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateSaleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let sale = state
        .services
        .sales
        .update_sale(
            id,
            UpdateSale {
                customer_name: payload.customer_name,
                discount: payload.discount,
                payment_method: payload.payment_method,
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
            model_name: "sale",
            object_id: Some(id),
            description: format!("Updated sale {}", id),
        },
    )
    .await;

    Ok(success_response(sale))
}

async fn delete_sale(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .sales
        .delete_sale(id)
        .await
        .map_err(map_service_error)?;

    record_activity(
        &state,
        &auth_user,
        &headers,
        ActivityContext {
            action_type: ActionType::Delete,
            model_name: "sale",
            object_id: Some(id),
            description: format!("Deleted sale {}", id),
        },
    )
    .await;

    Ok(no_content_response())
}

/// Render the HTML invoice for a sale, inline or as an attachment
async fn sale_invoice(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Query(query): Query<InvoiceQuery>,
) -> Result<Response, ApiError> {
    let format = match query.format.as_deref() {
        Some(raw) => InvoiceFormat::parse(raw).map_err(map_service_error)?,
        None => InvoiceFormat::default(),
    };

    let invoice = state
        .services
        .invoicing
        .render(id)
        .await
        .map_err(map_service_error)?;

    record_activity(
        &state,
        &auth_user,
        &headers,
        ActivityContext {
            action_type: ActionType::InvoiceGenerated,
            model_name: "sale",
            object_id: Some(id),
            description: format!("Generated invoice for sale {}", id),
        },
    )
    .await;

    let mut response = (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        invoice.html,
    )
        .into_response();

    if format == InvoiceFormat::Download {
        let disposition = format!("attachment; filename=\"{}\"", invoice.filename);
        if let Ok(value) = disposition.parse() {
            response
                .headers_mut()
                .insert(header::CONTENT_DISPOSITION, value);
        }
    }

    Ok(response)
}
