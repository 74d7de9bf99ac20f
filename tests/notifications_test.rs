mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{response_json, TestApp};

/// Sell enough of a medicine to push it to the given remaining stock.
async fn sell_down_to(app: &TestApp, medicine_id: i32, current: i32, remaining: i32) {
    let response = app
        .as_pharmacist(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "customer_name": "Walk-in",
                "payment_method": "cash",
                "items": [{ "medicine_id": medicine_id, "quantity": current - remaining }],
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn breach_notifies_admins_but_not_pharmacists() {
    let app = TestApp::new().await;
    let (med, _) = app.seed_medicine("Amoxicillin", "5.00", 20, 10).await;

    sell_down_to(&app, med.id, 20, 10).await;

    let response = app
        .as_admin(Method::GET, "/api/v1/notifications", None)
        .await;
    let admin_rows = response_json(response).await;
    let admin_rows = admin_rows.as_array().expect("array");
    assert_eq!(admin_rows.len(), 1);
    assert_eq!(admin_rows[0]["notification_type"], "low_stock");
    assert_eq!(admin_rows[0]["related_object_id"], med.id);

    let response = app
        .as_pharmacist(Method::GET, "/api/v1/notifications", None)
        .await;
    let pharmacist_rows = response_json(response).await;
    assert_eq!(pharmacist_rows.as_array().map(|a| a.len()), Some(0));
}

#[tokio::test]
async fn unread_breach_is_not_duplicated() {
    let app = TestApp::new().await;
    let (med, _) = app.seed_medicine("Ibuprofen", "2.00", 12, 10).await;

    sell_down_to(&app, med.id, 12, 9).await;
    sell_down_to(&app, med.id, 9, 7).await;

    let response = app
        .as_admin(Method::GET, "/api/v1/notifications/unread-count", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["unread"], 1);
}

#[tokio::test]
async fn read_notification_allows_a_new_alert() {
    let app = TestApp::new().await;
    let (med, _) = app.seed_medicine("Insulin", "50.00", 12, 10).await;

    sell_down_to(&app, med.id, 12, 9).await;

    let response = app
        .as_admin(Method::GET, "/api/v1/notifications", None)
        .await;
    let rows = response_json(response).await;
    let id = rows[0]["id"].as_i64().expect("notification id");

    let response = app
        .as_admin(
            Method::PUT,
            &format!("/api/v1/notifications/{}/read", id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    sell_down_to(&app, med.id, 9, 7).await;

    let response = app
        .as_admin(Method::GET, "/api/v1/notifications/unread-count", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["unread"], 1);
}

#[tokio::test]
async fn zero_stock_is_critical_priority() {
    let app = TestApp::new().await;
    let (med, _) = app.seed_medicine("Rare", "9.00", 3, 10).await;

    sell_down_to(&app, med.id, 3, 0).await;

    let response = app
        .as_admin(Method::GET, "/api/v1/notifications", None)
        .await;
    let rows = response_json(response).await;
    assert_eq!(rows[0]["priority"], "critical");
}

#[tokio::test]
async fn users_cannot_read_each_others_notifications() {
    let app = TestApp::new().await;
    let (med, _) = app.seed_medicine("Amoxicillin", "5.00", 12, 10).await;

    sell_down_to(&app, med.id, 12, 9).await;

    let response = app
        .as_admin(Method::GET, "/api/v1/notifications", None)
        .await;
    let rows = response_json(response).await;
    let id = rows[0]["id"].as_i64().expect("notification id");

    // The pharmacist does not own the admin's notification
    let response = app
        .as_pharmacist(
            Method::PUT,
            &format!("/api/v1/notifications/{}/read", id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mark_all_and_delete_read_cleanup() {
    let app = TestApp::new().await;
    let (a, _) = app.seed_medicine("A", "1.00", 12, 10).await;
    let (b, _) = app.seed_medicine("B", "1.00", 12, 10).await;

    sell_down_to(&app, a.id, 12, 9).await;
    sell_down_to(&app, b.id, 12, 9).await;

    let response = app
        .as_admin(Method::PUT, "/api/v1/notifications/read-all", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["updated"], 2);

    let response = app
        .as_admin(Method::DELETE, "/api/v1/notifications/read", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["deleted"], 2);

    let response = app
        .as_admin(Method::GET, "/api/v1/notifications", None)
        .await;
    let rows = response_json(response).await;
    assert_eq!(rows.as_array().map(|a| a.len()), Some(0));
}
