use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    middleware,
    routing::get,
    Router,
};
use chrono::{Days, NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use pharmacy_api::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db,
    entities::{inventory_item, medicine, user},
    AppState,
};

pub const TEST_PASSWORD: &str = "correct-horse-battery-staple";

/// Helper harness: full application router backed by a throwaway SQLite
/// database, with one seeded admin and one seeded pharmacist.
pub struct TestApp {
    router: Router,
    pub state: Arc<AppState>,
    pub auth_service: Arc<AuthService>,
    pub admin: user::Model,
    pub pharmacist: user::Model,
    admin_token: String,
    pharmacist_token: String,
    db_file: String,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_file = format!("pharmacy_test_{}.db", Uuid::new_v4().simple());
        let _ = std::fs::remove_file(&db_file);

        let mut cfg = AppConfig::new(
            format!("sqlite://{db_file}?mode=rwc"),
            "an_adequately_long_and_varied_testing_secret_value_0123456789_abcdef".to_string(),
            3600,
            86_400,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 2;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let auth_cfg = AuthConfig::from_app_config(&cfg);
        let auth_service = Arc::new(AuthService::new(auth_cfg, db_arc.clone()));

        let admin = seed_user(&auth_service, "admin", "admin@example.com", user::Role::Admin).await;
        let pharmacist = seed_user(
            &auth_service,
            "bob",
            "bob@example.com",
            user::Role::Pharmacist,
        )
        .await;

        let admin_token = auth_service
            .generate_token(&admin)
            .await
            .expect("admin token")
            .access_token;
        let pharmacist_token = auth_service
            .generate_token(&pharmacist)
            .await
            .expect("pharmacist token")
            .access_token;

        let state = Arc::new(AppState::new(
            db_arc.clone(),
            cfg.clone(),
            auth_service.clone(),
        ));

        let router = Router::new()
            .route("/", get(|| async { "pharmacy-api up" }))
            .merge(pharmacy_api::health_routes())
            .nest("/api/v1", pharmacy_api::api_v1_routes())
            .nest(
                "/auth",
                pharmacy_api::auth::auth_routes().with_state(auth_service.clone()),
            )
            .layer(middleware::from_fn_with_state(
                auth_service.clone(),
                |axum::extract::State(auth): axum::extract::State<Arc<AuthService>>,
                 mut req: axum::extract::Request,
                 next: axum::middleware::Next| async move {
                    req.extensions_mut().insert(auth);
                    next.run(req).await
                },
            ))
            .with_state(state.clone());

        Self {
            router,
            state,
            auth_service,
            admin,
            pharmacist,
            admin_token,
            pharmacist_token,
            db_file,
        }
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    pub fn pharmacist_token(&self) -> &str {
        &self.pharmacist_token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn as_admin(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request(method, uri, body, Some(&self.admin_token))
            .await
    }

    pub async fn as_pharmacist(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request(method, uri, body, Some(&self.pharmacist_token))
            .await
    }

    /// Authenticated request with extra headers (proxy headers and the like)
    pub async fn as_admin_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        builder = builder.header("authorization", format!("Bearer {}", self.admin_token));
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Seed a medicine with its inventory row directly, bypassing HTTP.
    pub async fn seed_medicine(
        &self,
        name: &str,
        price: &str,
        stock: i32,
        reorder_level: i32,
    ) -> (medicine::Model, inventory_item::Model) {
        let now = Utc::now();
        let med = medicine::ActiveModel {
            name: Set(name.to_string()),
            category: Set("general".to_string()),
            price: Set(price.parse().expect("decimal price")),
            quantity: Set(stock),
            batch_number: Set(None),
            expiration_date: Set(future_date(365)),
            supplier_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed medicine");

        let item = inventory_item::ActiveModel {
            medicine_id: Set(med.id),
            current_stock: Set(stock),
            reorder_level: Set(reorder_level),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed inventory item");

        (med, item)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_file);
    }
}

async fn seed_user(
    auth_service: &AuthService,
    username: &str,
    email: &str,
    role: user::Role,
) -> user::Model {
    let now = Utc::now();
    user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(auth_service
            .hash_password(TEST_PASSWORD)
            .expect("hash test password")),
        role: Set(role),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&*auth_service.db)
    .await
    .expect("seed user")
}

/// A date `days` from today, for non-expired seed data
pub fn future_date(days: u64) -> NaiveDate {
    Utc::now()
        .date_naive()
        .checked_add_days(Days::new(days))
        .expect("date arithmetic")
}

/// Read a JSON response body
pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is json")
}

/// Read a plain response body as text
pub async fn response_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    String::from_utf8(bytes.to_vec()).expect("response body is utf-8")
}

#[allow(dead_code)]
pub fn assert_status(response: &axum::response::Response, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}
