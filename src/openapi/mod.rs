use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Marketplace API",
        version = "0.1.0",
        description = r#"
# Marketplace API

Customers order substances from dealers; dealers restock from providers through
purchase orders; dealers ship customer orders.

## Authentication

Log in with `POST /api/auth/login`. The token comes back in the body and as an
HttpOnly session cookie; either may be presented:

```
Authorization: Bearer <token>
```

## Pagination

List endpoints take `page` (default 1) and `limit` (default 20, max 100).
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Registration and sessions"),
        (name = "orders", description = "Customer orders"),
        (name = "order-items", description = "Order line items"),
        (name = "purchase-orders", description = "Dealer restocking from providers"),
        (name = "shipments", description = "Order shipments")
    ),
    paths(
        // Auth
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::auth::me,

        // Orders
        crate::handlers::orders::list_orders,
        crate::handlers::orders::create_order,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order,
        crate::handlers::orders::update_order_status,
        crate::handlers::orders::delete_order,
        crate::handlers::orders::list_order_items,

        // Order items
        crate::handlers::order_items::create_order_item,
        crate::handlers::order_items::get_order_item,
        crate::handlers::order_items::update_order_item,
        crate::handlers::order_items::delete_order_item,

        // Purchase orders
        crate::handlers::purchase_orders::list_purchase_orders,
        crate::handlers::purchase_orders::create_purchase_order,
        crate::handlers::purchase_orders::get_purchase_order,
        crate::handlers::purchase_orders::update_purchase_order,
        crate::handlers::purchase_orders::update_purchase_order_status,
        crate::handlers::purchase_orders::delete_purchase_order,

        // Shipments
        crate::handlers::shipments::create_shipment,
        crate::handlers::shipments::get_shipment,
        crate::handlers::shipments::get_order_shipment,
        crate::handlers::shipments::update_shipment,
        crate::handlers::shipments::delete_shipment,
    ),
    components(
        schemas(
            crate::ListQuery,
            crate::Deleted,
            crate::auth::ActorKind,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::LoginResponse,
            crate::services::accounts::Account,
            crate::services::accounts::RegisterAccount,
            crate::services::orders::NewOrderLine,
            crate::entities::order::OrderStatus,
            crate::entities::order::PaymentStatus,
            crate::entities::purchase_order::PurchaseOrderStatus,
            crate::entities::shipment::ShipmentStatus,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDocV1;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_documents_core_flows() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Marketplace API"));
        assert!(json.contains("/api/auth/login"));
        assert!(json.contains("/api/orders/{id}/status"));
        assert!(json.contains("/api/purchase-orders"));
        assert!(json.contains("/api/shipments/{id}"));
        assert!(json.contains("bearer_auth"));
    }
}
