//! Pharmacy API Library
//!
//! Backend for pharmacy operations: medicine catalog, stock tracking,
//! sales with invoicing, supplier purchase orders, notifications, and an
//! append-only activity trail.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod migrator;
pub mod request_id;
pub mod services;

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;

use crate::auth::{AuthRouterExt, Capabilities};

pub use handlers::{AppServices, AppState};

/// The versioned API surface. Every router is gated by the capability
/// table; unauthenticated requests never reach a handler.
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest(
            "/medicines",
            handlers::medicines::medicine_routes().with_capability(Capabilities::MEDICINES),
        )
        .nest(
            "/inventory",
            handlers::inventory::inventory_routes().with_capability(Capabilities::INVENTORY),
        )
        .nest(
            "/sales",
            handlers::sales::sale_routes().with_capability(Capabilities::SALES),
        )
        .nest(
            "/reports",
            handlers::reports::report_routes().with_capability(Capabilities::REPORTS),
        )
        .nest(
            "/suppliers",
            handlers::suppliers::supplier_routes().with_capability(Capabilities::SUPPLIERS),
        )
        .nest(
            "/purchase-orders",
            handlers::purchase_orders::purchase_order_routes()
                .with_capability(Capabilities::PURCHASE_ORDERS),
        )
        .nest(
            "/users",
            handlers::users::user_routes().with_capability(Capabilities::USERS),
        )
        .nest(
            "/notifications",
            handlers::notifications::notification_routes()
                .with_capability(Capabilities::NOTIFICATIONS),
        )
        .nest(
            "/activity-logs",
            handlers::activity_logs::activity_log_routes().with_capability(Capabilities::ACTIVITY),
        )
}

/// Unauthenticated health and status routes
pub fn health_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match db::check_connection(&state.db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "healthy", "database": "up" })),
        ),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "unhealthy", "database": "down" })),
        ),
    }
}

async fn status_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
