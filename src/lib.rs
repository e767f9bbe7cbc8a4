//! Marketplace API Library
//!
//! Customers order substances from dealers, dealers restock from providers,
//! and every write runs through one authorization policy table.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::{DefaultBodyLimit, State},
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::auth::{AuthConfig, AuthService};
use crate::db::DbPool;
use crate::services::{AppServices, Page};

/// Largest page a list endpoint will return.
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub services: AppServices,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(db: Arc<DbPool>, config: config::AppConfig) -> Self {
        let services = AppServices::new(db.clone(), &config);
        let auth = Arc::new(AuthService::new(AuthConfig::from(&config)));
        Self {
            db,
            config,
            services,
            auth,
        }
    }
}

// Common query parameters for list endpoints
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl ListQuery {
    /// Page from 1, limit between 1 and [`MAX_PAGE_SIZE`].
    pub fn normalized(&self) -> (u64, u64) {
        (self.page.max(1), self.limit.clamp(1, MAX_PAGE_SIZE))
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> From<Page<T>> for PaginatedResponse<T> {
    fn from(page: Page<T>) -> Self {
        let total_pages = page.total_pages();
        Self {
            items: page.items,
            total: page.total,
            page: page.page,
            limit: page.limit,
            total_pages,
        }
    }
}

/// Body of a successful delete.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Deleted {
    pub id: i32,
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Every route under `/api`. Registration, login and status are public; the
/// rest sit behind the session middleware.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    use handlers::{
        accounts, auth as auth_handlers, images, inventory, order_items, orders,
        provider_transports, purchase_orders, shipments, substances,
    };

    let public = Router::new()
        .route("/auth/register/:kind", post(auth_handlers::register))
        .route("/auth/login", post(auth_handlers::login))
        .route("/status", get(api_status));

    let upload_limit = state.config.max_upload_bytes + 64 * 1024;
    let uploads = Router::new()
        .route(
            "/images/:kind/:id",
            post(images::upload_image).get(images::get_image),
        )
        .route("/images/:kind/:id/exists", get(images::image_exists))
        .layer(DefaultBodyLimit::max(upload_limit));

    let protected = Router::new()
        .route("/auth/logout", post(auth_handlers::logout))
        .route("/auth/me", get(auth_handlers::me))
        // Accounts
        .route(
            "/customers/:id",
            get(accounts::get_customer)
                .put(accounts::update_customer)
                .delete(accounts::delete_customer),
        )
        .route("/dealers", get(accounts::list_dealers))
        .route(
            "/dealers/:id",
            get(accounts::get_dealer)
                .put(accounts::update_dealer)
                .delete(accounts::delete_dealer),
        )
        .route("/providers", get(accounts::list_providers))
        .route(
            "/providers/:id",
            get(accounts::get_provider)
                .put(accounts::update_provider)
                .delete(accounts::delete_provider),
        )
        // Catalog
        .route(
            "/substances",
            get(substances::list_substances).post(substances::create_substance),
        )
        .route(
            "/substances/:id",
            get(substances::get_substance)
                .put(substances::update_substance)
                .delete(substances::delete_substance),
        )
        .route(
            "/provider-transports",
            get(provider_transports::list_transports).post(provider_transports::create_transport),
        )
        .route(
            "/provider-transports/:id",
            get(provider_transports::get_transport)
                .put(provider_transports::update_transport)
                .delete(provider_transports::delete_transport),
        )
        .route(
            "/inventory",
            get(inventory::list_inventory).post(inventory::create_inventory),
        )
        .route(
            "/inventory/:id",
            get(inventory::get_inventory)
                .put(inventory::update_inventory)
                .delete(inventory::delete_inventory),
        )
        // Orders
        .route("/orders", get(orders::list_orders).post(orders::create_order))
        .route(
            "/orders/:id",
            get(orders::get_order)
                .put(orders::update_order)
                .delete(orders::delete_order),
        )
        .route("/orders/:id/status", put(orders::update_order_status))
        .route("/orders/:id/items", get(orders::list_order_items))
        .route("/orders/:id/shipment", get(shipments::get_order_shipment))
        .route("/order-items", post(order_items::create_order_item))
        .route(
            "/order-items/:id",
            get(order_items::get_order_item)
                .put(order_items::update_order_item)
                .delete(order_items::delete_order_item),
        )
        // Procurement
        .route(
            "/purchase-orders",
            get(purchase_orders::list_purchase_orders)
                .post(purchase_orders::create_purchase_order),
        )
        .route(
            "/purchase-orders/:id",
            get(purchase_orders::get_purchase_order)
                .put(purchase_orders::update_purchase_order)
                .delete(purchase_orders::delete_purchase_order),
        )
        .route(
            "/purchase-orders/:id/status",
            put(purchase_orders::update_purchase_order_status),
        )
        // Shipments
        .route("/shipments", post(shipments::create_shipment))
        .route(
            "/shipments/:id",
            get(shipments::get_shipment)
                .put(shipments::update_shipment)
                .delete(shipments::delete_shipment),
        )
        .merge(uploads)
        .route_layer(axum::middleware::from_fn_with_state(
            state.auth.clone(),
            auth::auth_middleware,
        ));

    public.merge(protected)
}

/// The application router without the deployment-specific outer layers
/// (CORS, compression, Swagger UI) that `main` adds.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::health_routes())
        .nest("/api", api_routes(&state))
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

async fn api_status(State(state): State<AppState>) -> ApiResult<Value> {
    let database = match db::check_connection(&state.db).await {
        Ok(()) => "connected",
        Err(_) => "unreachable",
    };
    let status_data = json!({
        "status": if database == "connected" { "ok" } else { "degraded" },
        "service": "marketplace-api",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "database": database,
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[test]
    fn list_query_is_clamped() {
        let query = ListQuery { page: 0, limit: 500 };
        assert_eq!(query.normalized(), (1, MAX_PAGE_SIZE));
        let query = ListQuery { page: 3, limit: 0 };
        assert_eq!(query.normalized(), (3, 1));
        assert_eq!(ListQuery::default().normalized(), (1, 20));
    }

    #[test]
    fn pages_convert_into_paginated_responses() {
        let page = Page {
            items: vec![1, 2, 3],
            total: 41,
            page: 2,
            limit: 20,
        };
        let response = PaginatedResponse::from(page);
        assert_eq!(response.total_pages, 3);
        assert_eq!(response.items, vec![1, 2, 3]);
    }
}
