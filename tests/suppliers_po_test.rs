mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{response_json, TestApp};

async fn create_supplier(app: &TestApp, name: &str) -> i64 {
    let response = app
        .as_admin(
            Method::POST,
            "/api/v1/suppliers",
            Some(json!({
                "name": name,
                "email": "sales@example.com",
                "phone": "+1-555-0100",
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    body["id"].as_i64().expect("supplier id")
}

#[tokio::test]
async fn supplier_delete_is_a_soft_delete() {
    let app = TestApp::new().await;
    let id = create_supplier(&app, "Acme Pharma").await;

    let response = app
        .as_admin(Method::DELETE, &format!("/api/v1/suppliers/{}", id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["is_active"], false);

    // Gone from the default listing
    let response = app.as_admin(Method::GET, "/api/v1/suppliers", None).await;
    let rows = response_json(response).await;
    assert_eq!(rows.as_array().map(|a| a.len()), Some(0));

    // Still visible when inactive suppliers are included
    let response = app
        .as_admin(
            Method::GET,
            "/api/v1/suppliers?include_inactive=true",
            None,
        )
        .await;
    let rows = response_json(response).await;
    assert_eq!(rows.as_array().map(|a| a.len()), Some(1));

    // And still retrievable by id
    let response = app
        .as_admin(Method::GET, &format!("/api/v1/suppliers/{}", id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn deactivated_suppliers_can_be_restored() {
    let app = TestApp::new().await;
    let id = create_supplier(&app, "Acme Pharma").await;

    app.as_admin(Method::DELETE, &format!("/api/v1/suppliers/{}", id), None)
        .await;

    let response = app
        .as_admin(
            Method::POST,
            &format!("/api/v1/suppliers/{}/reactivate", id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["is_active"], true);
}

#[tokio::test]
async fn purchase_order_carries_its_items() {
    let app = TestApp::new().await;
    let supplier_id = create_supplier(&app, "Acme Pharma").await;

    let response = app
        .as_admin(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(json!({
                "supplier_id": supplier_id,
                "notes": "Quarterly restock",
                "items": [
                    { "medicine_name": "Amoxicillin 500mg", "quantity": 100, "unit_price": "8.00" },
                    { "medicine_name": "Ibuprofen 200mg", "quantity": 50, "unit_price": "1.50" },
                ],
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    assert_eq!(body["status"], "pending");
    // 100 * 8.00 + 50 * 1.50 = 875.00
    assert_eq!(body["total_amount"], "875.00");
    assert_eq!(body["items"].as_array().map(|a| a.len()), Some(2));
}

#[tokio::test]
async fn purchase_orders_filter_by_status() {
    let app = TestApp::new().await;
    let supplier_id = create_supplier(&app, "Acme Pharma").await;

    let order = json!({
        "supplier_id": supplier_id,
        "items": [{ "medicine_name": "Saline", "quantity": 10, "unit_price": "2.00" }],
    });
    let response = app
        .as_admin(Method::POST, "/api/v1/purchase-orders", Some(order.clone()))
        .await;
    let first = response_json(response).await;
    let first_id = first["id"].as_i64().expect("order id");
    app.as_admin(Method::POST, "/api/v1/purchase-orders", Some(order))
        .await;

    let response = app
        .as_admin(
            Method::PUT,
            &format!("/api/v1/purchase-orders/{}", first_id),
            Some(json!({ "status": "received" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .as_admin(Method::GET, "/api/v1/purchase-orders?status=received", None)
        .await;
    let rows = response_json(response).await;
    let rows = rows.as_array().expect("array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], first_id);

    let response = app
        .as_admin(Method::GET, "/api/v1/purchase-orders?status=pending", None)
        .await;
    let rows = response_json(response).await;
    assert_eq!(rows.as_array().map(|a| a.len()), Some(1));
}

#[tokio::test]
async fn orders_against_inactive_suppliers_are_rejected() {
    let app = TestApp::new().await;
    let supplier_id = create_supplier(&app, "Dormant Supply Co").await;
    app.as_admin(
        Method::DELETE,
        &format!("/api/v1/suppliers/{}", supplier_id),
        None,
    )
    .await;

    let response = app
        .as_admin(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(json!({
                "supplier_id": supplier_id,
                "items": [{ "medicine_name": "Saline", "quantity": 10, "unit_price": "2.00" }],
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn mutations_land_in_the_activity_log() {
    let app = TestApp::new().await;
    create_supplier(&app, "Acme Pharma").await;

    let response = app
        .as_admin(Method::GET, "/api/v1/activity-logs", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let entries = response_json(response).await;
    let entries = entries.as_array().expect("array");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["action_type"], "create");
    assert_eq!(entries[0]["model_name"], "supplier");
    assert_eq!(entries[0]["username"], "admin");
}

#[tokio::test]
async fn activity_summary_breaks_down_by_action_and_user() {
    let app = TestApp::new().await;
    create_supplier(&app, "First").await;
    create_supplier(&app, "Second").await;
    let (med, _) = app.seed_medicine("Med", "2.00", 30, 5).await;
    let response = app
        .as_pharmacist(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "customer_name": "Walk-in",
                "payment_method": "cash",
                "items": [{ "medicine_id": med.id, "quantity": 1 }],
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .as_admin(Method::GET, "/api/v1/activity-logs/summary", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["total_activities"], 3);
    assert_eq!(body["active_users"], 2);
    assert_eq!(body["action_breakdown"]["create"], 2);
    assert_eq!(body["action_breakdown"]["sale"], 1);
    assert_eq!(body["user_breakdown"]["admin"], 2);
    assert_eq!(body["user_breakdown"]["bob"], 1);
}

#[tokio::test]
async fn activity_log_records_forwarded_client_ip() {
    let app = TestApp::new().await;

    let response = app
        .as_admin_with_headers(
            Method::POST,
            "/api/v1/suppliers",
            Some(json!({ "name": "Proxied Pharma" })),
            &[("x-forwarded-for", "203.0.113.7, 10.0.0.1")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let listing = app
        .as_admin(Method::GET, "/api/v1/activity-logs", None)
        .await;
    let entries = response_json(listing).await;
    assert_eq!(entries[0]["ip_address"], "203.0.113.7");
}
