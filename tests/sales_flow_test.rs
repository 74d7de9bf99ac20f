mod common;

use axum::http::{header, Method, StatusCode};
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;

use common::{response_json, response_text, TestApp};
use pharmacy_api::entities::{sale, sale_item};

#[tokio::test]
async fn sale_decrements_stock_and_captures_prices() {
    let app = TestApp::new().await;
    let (amox, _) = app.seed_medicine("Amoxicillin", "12.50", 40, 10).await;
    let (ibu, _) = app.seed_medicine("Ibuprofen", "3.25", 30, 5).await;

    let response = app
        .as_pharmacist(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "customer_name": "Alice",
                "payment_method": "cash",
                "items": [
                    { "medicine_id": amox.id, "quantity": 2 },
                    { "medicine_id": ibu.id, "quantity": 4 },
                ],
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    // 2 * 12.50 + 4 * 3.25 = 38.00
    assert_eq!(body["total_amount"], "38.00");
    assert_eq!(body["final_amount"], "38.00");
    assert_eq!(body["items"].as_array().map(|a| a.len()), Some(2));

    let amox_stock = app
        .state
        .services
        .inventory
        .get_item_by_medicine(amox.id)
        .await
        .expect("inventory row");
    assert_eq!(amox_stock.current_stock, 38);
}

#[tokio::test]
async fn sale_with_unknown_medicine_rolls_back_entirely() {
    let app = TestApp::new().await;
    let (med, _) = app.seed_medicine("Known", "5.00", 10, 2).await;

    let response = app
        .as_pharmacist(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "customer_name": "Bob",
                "payment_method": "card",
                "items": [
                    { "medicine_id": med.id, "quantity": 3 },
                    { "medicine_id": 9999, "quantity": 1 },
                ],
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let stock = app
        .state
        .services
        .inventory
        .get_item_by_medicine(med.id)
        .await
        .expect("inventory row");
    assert_eq!(stock.current_stock, 10);

    let sales = sale::Entity::find().count(&*app.state.db).await.unwrap();
    assert_eq!(sales, 0);
    let items = sale_item::Entity::find()
        .count(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(items, 0);
}

#[tokio::test]
async fn insufficient_stock_rolls_back_earlier_lines() {
    let app = TestApp::new().await;
    let (plenty, _) = app.seed_medicine("Plenty", "2.00", 50, 5).await;
    let (scarce, _) = app.seed_medicine("Scarce", "2.00", 1, 5).await;

    let response = app
        .as_pharmacist(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "customer_name": "Carol",
                "payment_method": "cash",
                "items": [
                    { "medicine_id": plenty.id, "quantity": 10 },
                    { "medicine_id": scarce.id, "quantity": 5 },
                ],
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // The first line's decrement must be rolled back with the sale
    let stock = app
        .state
        .services
        .inventory
        .get_item_by_medicine(plenty.id)
        .await
        .expect("inventory row");
    assert_eq!(stock.current_stock, 50);
}

#[tokio::test]
async fn caller_supplied_unit_price_overrides_catalog_price() {
    let app = TestApp::new().await;
    let (med, _) = app.seed_medicine("Amoxicillin", "10.00", 20, 5).await;

    let response = app
        .as_pharmacist(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "customer_name": "Hana",
                "payment_method": "cash",
                "items": [
                    { "medicine_id": med.id, "quantity": 2, "unit_price": "8.00" },
                ],
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    assert_eq!(body["total_amount"], "16.00");
    assert_eq!(body["items"][0]["price"], "8.00");
}

#[tokio::test]
async fn negative_unit_price_is_rejected() {
    let app = TestApp::new().await;
    let (med, _) = app.seed_medicine("Med", "10.00", 20, 5).await;

    let response = app
        .as_pharmacist(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "customer_name": "Ivan",
                "payment_method": "cash",
                "items": [
                    { "medicine_id": med.id, "quantity": 1, "unit_price": "-1.00" },
                ],
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn discount_is_applied_to_final_amount() {
    let app = TestApp::new().await;
    let (med, _) = app.seed_medicine("Amoxicillin", "45.50", 20, 5).await;

    let response = app
        .as_pharmacist(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "customer_name": "Dave",
                "payment_method": "insurance",
                "discount": "5.00",
                "items": [{ "medicine_id": med.id, "quantity": 1 }],
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    assert_eq!(body["total_amount"], "45.50");
    assert_eq!(body["discount"], "5.00");
    assert_eq!(body["final_amount"], "40.50");
}

#[tokio::test]
async fn daily_report_sums_final_amounts_exactly() {
    let app = TestApp::new().await;
    let (a, _) = app.seed_medicine("A", "40.50", 100, 5).await;
    let (b, _) = app.seed_medicine("B", "28.75", 100, 5).await;

    for (medicine_id, method) in [(a.id, "cash"), (b.id, "card")] {
        let response = app
            .as_pharmacist(
                Method::POST,
                "/api/v1/sales",
                Some(json!({
                    "customer_name": "Walk-in",
                    "payment_method": method,
                    "items": [{ "medicine_id": medicine_id, "quantity": 1 }],
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .as_pharmacist(Method::GET, "/api/v1/reports/sales/daily", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["total_sales"], 2);
    assert_eq!(body["total_amount"], "69.25");
    assert_eq!(body["payment_methods"]["cash"]["count"], 1);
    assert_eq!(body["payment_methods"]["cash"]["amount"], "40.50");
    assert_eq!(body["payment_methods"]["card"]["count"], 1);
}

#[tokio::test]
async fn sale_update_cannot_touch_the_date() {
    let app = TestApp::new().await;
    let (med, _) = app.seed_medicine("Med", "10.00", 20, 5).await;

    let response = app
        .as_pharmacist(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "customer_name": "Eve",
                "payment_method": "cash",
                "items": [{ "medicine_id": med.id, "quantity": 1 }],
            })),
        )
        .await;
    let created = response_json(response).await;
    let id = created["id"].as_i64().expect("sale id");
    let original_date = created["date"].clone();

    let response = app
        .as_pharmacist(
            Method::PUT,
            &format!("/api/v1/sales/{}", id),
            Some(json!({ "customer_name": "Eve Adams", "payment_method": "card" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let updated = response_json(response).await;
    assert_eq!(updated["customer_name"], "Eve Adams");
    assert_eq!(updated["payment_method"], "card");
    assert_eq!(updated["date"], original_date);
}

#[tokio::test]
async fn invoice_renders_html_with_line_items() {
    let app = TestApp::new().await;
    let (med, _) = app.seed_medicine("Amoxicillin 500mg", "12.50", 20, 5).await;

    let response = app
        .as_pharmacist(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "customer_name": "Frank",
                "payment_method": "cash",
                "items": [{ "medicine_id": med.id, "quantity": 2 }],
            })),
        )
        .await;
    let created = response_json(response).await;
    let id = created["id"].as_i64().expect("sale id");

    let response = app
        .as_pharmacist(
            Method::GET,
            &format!("/api/v1/sales/{}/invoice?format=download", id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("text/html"))
        .unwrap_or(false));
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"invoice_"));

    let html = response_text(response).await;
    assert!(html.contains("Amoxicillin 500mg"));
    assert!(html.contains("Frank"));
    assert!(html.contains("25.00"));
}

#[tokio::test]
async fn unknown_invoice_format_is_rejected() {
    let app = TestApp::new().await;
    let (med, _) = app.seed_medicine("Med", "1.00", 5, 2).await;

    let response = app
        .as_pharmacist(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "customer_name": "Grace",
                "payment_method": "cash",
                "items": [{ "medicine_id": med.id, "quantity": 1 }],
            })),
        )
        .await;
    let created = response_json(response).await;
    let id = created["id"].as_i64().expect("sale id");

    let response = app
        .as_pharmacist(
            Method::GET,
            &format!("/api/v1/sales/{}/invoice?format=pdf", id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
