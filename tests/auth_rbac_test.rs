mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{response_json, TestApp, TEST_PASSWORD};

#[tokio::test]
async fn requests_without_a_token_are_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/medicines", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn garbage_tokens_are_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/medicines",
            None,
            Some("not-a-real-token"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn pharmacists_cannot_reach_admin_surfaces() {
    let app = TestApp::new().await;

    for uri in [
        "/api/v1/suppliers",
        "/api/v1/purchase-orders",
        "/api/v1/users",
    ] {
        let response = app.as_pharmacist(Method::GET, uri, None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "uri: {}", uri);

        let response = app.as_admin(Method::GET, uri, None).await;
        assert_eq!(response.status(), StatusCode::OK, "uri: {}", uri);
    }
}

#[tokio::test]
async fn pharmacists_can_use_staff_surfaces() {
    let app = TestApp::new().await;

    for uri in [
        "/api/v1/medicines",
        "/api/v1/inventory",
        "/api/v1/sales",
        "/api/v1/reports/sales/daily",
        "/api/v1/activity-logs",
    ] {
        let response = app.as_pharmacist(Method::GET, uri, None).await;
        assert_eq!(response.status(), StatusCode::OK, "uri: {}", uri);
    }
}

#[tokio::test]
async fn login_returns_tokens_and_records_activity() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "username": "admin", "password": TEST_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert!(body["access_token"].as_str().is_some());
    assert!(body["refresh_token"].as_str().is_some());
    assert_eq!(body["user"]["username"], "admin");
    // The hash never leaves the server
    assert!(body["user"].get("password_hash").is_none());

    let response = app
        .as_admin(Method::GET, "/api/v1/activity-logs?action=login", None)
        .await;
    let entries = response_json(response).await;
    assert_eq!(entries.as_array().map(|a| a.len()), Some(1));
}

#[tokio::test]
async fn wrong_password_is_a_uniform_401() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "username": "admin", "password": "wrong" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "username": "nobody", "password": "wrong" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_rotation_invalidates_the_old_token() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "username": "bob", "password": TEST_PASSWORD })),
            None,
        )
        .await;
    let body = response_json(response).await;
    let refresh = body["refresh_token"].as_str().expect("refresh token");

    let response = app
        .request(
            Method::POST,
            "/auth/refresh",
            Some(json!({ "refresh_token": refresh })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = response_json(response).await;
    assert!(rotated["access_token"].as_str().is_some());

    // The consumed refresh token must not work a second time
    let response = app
        .request(
            Method::POST,
            "/auth/refresh",
            Some(json!({ "refresh_token": refresh })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_the_access_token() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "username": "bob", "password": TEST_PASSWORD })),
            None,
        )
        .await;
    let body = response_json(response).await;
    let access = body["access_token"].as_str().expect("access token");

    let response = app
        .request(Method::POST, "/auth/logout", None, Some(access))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(Method::GET, "/api/v1/medicines", None, Some(access))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_rejects_duplicate_usernames() {
    let app = TestApp::new().await;

    let payload = json!({
        "username": "admin",
        "email": "other@example.com",
        "password": "a-long-enough-password",
        "role": "pharmacist",
    });
    let response = app
        .request(Method::POST, "/auth/register", Some(payload), None)
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn role_changes_require_admin() {
    let app = TestApp::new().await;
    let target_id = app.pharmacist.id;

    // Even on their own profile a pharmacist cannot escalate their role
    let response = app
        .as_pharmacist(
            Method::PUT,
            &format!("/api/v1/users/{}", target_id),
            Some(json!({ "role": "admin" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .as_admin(
            Method::PUT,
            &format!("/api/v1/users/{}", target_id),
            Some(json!({ "role": "admin" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["role"], "admin");
}

#[tokio::test]
async fn pharmacists_can_view_and_edit_their_own_profile() {
    let app = TestApp::new().await;
    let own_id = app.pharmacist.id;

    let response = app
        .as_pharmacist(Method::GET, &format!("/api/v1/users/{}", own_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["username"], "bob");

    let response = app
        .as_pharmacist(
            Method::PUT,
            &format!("/api/v1/users/{}", own_id),
            Some(json!({ "email": "bob@pharmacy.example" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["email"], "bob@pharmacy.example");
    assert_eq!(body["role"], "pharmacist");
}

#[tokio::test]
async fn pharmacists_cannot_touch_other_profiles() {
    let app = TestApp::new().await;
    let admin_id = app.admin.id;

    let response = app
        .as_pharmacist(Method::GET, &format!("/api/v1/users/{}", admin_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .as_pharmacist(
            Method::PUT,
            &format!("/api/v1/users/{}", admin_id),
            Some(json!({ "email": "hijack@example.com" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .as_pharmacist(
            Method::DELETE,
            &format!("/api/v1/users/{}", admin_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admins_cannot_delete_themselves() {
    let app = TestApp::new().await;
    let own_id = app.admin.id;

    let response = app
        .as_admin(Method::DELETE, &format!("/api/v1/users/{}", own_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
