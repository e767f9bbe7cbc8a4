#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use marketplace_api::{config::AppConfig, db, AppState};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

pub const PASSWORD: &str = "s3cret-pass";

/// Helper harness for spinning up the application against an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _uploads: TempDir,
}

/// A registered, logged-in account.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: i32,
    pub token: String,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let uploads = tempfile::tempdir().expect("create upload dir");

        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "integration-tests-signing-key-0123456789abcdef".to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // One connection so every query sees the same in-memory database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.upload_dir = uploads.path().to_string_lossy().into_owned();
        cfg.max_upload_bytes = 64 * 1024;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = marketplace_api::build_router(state.clone());

        Self {
            router,
            state,
            _uploads: uploads,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Send a JSON request with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    /// Sends a request and returns its status with the decoded JSON body.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body, token).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    pub async fn register(&self, kind: &str, username: &str) -> i32 {
        let (status, body) = self
            .call(
                Method::POST,
                &format!("/api/auth/register/{}", kind),
                Some(json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": PASSWORD,
                    "full_name": format!("{} account", username),
                })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {}: {}", username, body);
        body["data"]["id"].as_i64().expect("account id") as i32
    }

    pub async fn login(&self, kind: &str, login: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/login",
                Some(json!({ "kind": kind, "login": login, "password": PASSWORD })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login {}: {}", login, body);
        body["data"]["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }

    /// Registers an account of `kind` and logs it in.
    pub async fn signup(&self, kind: &str, username: &str) -> Session {
        let id = self.register(kind, username).await;
        let token = self.login(kind, username).await;
        Session { id, token }
    }

    /// A provider-owned substance; returns its id.
    pub async fn seed_substance(&self, provider: &Session, name: &str, price: &str) -> i32 {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/substances",
                Some(json!({ "name": name, "category": "reagent", "unit_price": price })),
                Some(&provider.token),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "seed substance: {}", body);
        body["data"]["id"].as_i64().expect("substance id") as i32
    }

    /// A pending order from `customer` with one line; returns the order id.
    pub async fn seed_order(
        &self,
        customer: &Session,
        dealer: &Session,
        substance_id: i32,
        quantity: i32,
        unit_price: &str,
    ) -> i32 {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/orders",
                Some(json!({
                    "dealer_id": dealer.id,
                    "delivery_address": "1 Harbour Road",
                    "payment_method": "card",
                    "items": [
                        { "substance_id": substance_id, "quantity": quantity, "unit_price": unit_price }
                    ]
                })),
                Some(&customer.token),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "seed order: {}", body);
        body["data"]["order"]["id"].as_i64().expect("order id") as i32
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("json response")
}

/// Reads a money field whether it was serialized as a string or a number.
pub fn money(value: &Value) -> Decimal {
    serde_json::from_value(value.clone()).expect("decimal value")
}
