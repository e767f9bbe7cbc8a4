use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};

use super::{created, found};
use crate::auth::{gate, Action, Actor, Resource};
use crate::entities::{order::Model as Order, order_item::Model as OrderItem};
use crate::errors::ServiceError;
use crate::services::orders::{NewOrder, OrderDetail, UpdateOrder, UpdateOrderStatus};
use crate::{ApiResponse, ApiResult, AppState, Deleted, ListQuery, PaginatedResponse};

async fn load_order(state: &AppState, id: i32) -> Result<Order, ServiceError> {
    found(state.services.orders.get(id).await?, "Order", id)
}

/// Orders placed by the calling customer, or placed with the calling dealer.
#[utoipa::path(
    get,
    path = "/api/orders",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of orders", body = PaginatedResponse<Order>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Providers have no orders", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<Order>> {
    gate(&actor, Resource::Order, Action::List, None)?;
    let (page, limit) = query.normalized();
    let orders = state.services.orders.list_for(&actor, page, limit).await?;
    Ok(Json(ApiResponse::success(orders.into())))
}

/// Places an order with its items; the total is computed from the items.
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = NewOrder,
    responses(
        (status = 201, description = "Order created", body = OrderDetail,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid order", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Only customers place orders", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<NewOrder>,
) -> Result<impl IntoResponse, ServiceError> {
    gate(&actor, Resource::Order, Action::Create, None)?;
    let detail = state.services.orders.create(actor.id, payload).await?;
    Ok(created(detail))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with its items", body = OrderDetail),
        (status = 403, description = "Not a party to the order", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
) -> ApiResult<OrderDetail> {
    let order = load_order(&state, id).await?;
    gate(&actor, Resource::Order, Action::Read, Some(&order))?;
    let items = state.services.orders.items(id).await?;
    Ok(Json(ApiResponse::success(OrderDetail { order, items })))
}

#[utoipa::path(
    put,
    path = "/api/orders/{id}",
    params(("id" = i32, Path, description = "Order id")),
    request_body = UpdateOrder,
    responses(
        (status = 200, description = "Order updated", body = Order),
        (status = 400, description = "Invalid input or order no longer pending", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the ordering customer", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateOrder>,
) -> ApiResult<Order> {
    let order = load_order(&state, id).await?;
    gate(&actor, Resource::Order, Action::Update, Some(&order))?;
    let updated = state.services.orders.update(order, payload).await?;
    Ok(Json(ApiResponse::success(updated)))
}

/// Dealer-side fulfilment and payment status.
#[utoipa::path(
    put,
    path = "/api/orders/{id}/status",
    params(("id" = i32, Path, description = "Order id")),
    request_body = UpdateOrderStatus,
    responses(
        (status = 200, description = "Status updated", body = Order),
        (status = 400, description = "No status supplied", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the fulfilling dealer", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateOrderStatus>,
) -> ApiResult<Order> {
    let order = load_order(&state, id).await?;
    gate(&actor, Resource::Order, Action::UpdateStatus, Some(&order))?;
    let updated = state.services.orders.update_status(order, payload).await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{id}",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order deleted", body = Deleted),
        (status = 400, description = "Order no longer pending", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the ordering customer", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
) -> ApiResult<Deleted> {
    let order = load_order(&state, id).await?;
    gate(&actor, Resource::Order, Action::Delete, Some(&order))?;
    state.services.orders.delete(order).await?;
    Ok(Json(ApiResponse::success(Deleted { id })))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}/items",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Items of the order", body = Vec<OrderItem>),
        (status = 403, description = "Not a party to the order", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "order-items"
)]
pub async fn list_order_items(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
) -> ApiResult<Vec<OrderItem>> {
    let order = load_order(&state, id).await?;
    gate(&actor, Resource::OrderItem, Action::Read, Some(&order))?;
    let items = state.services.orders.items(id).await?;
    Ok(Json(ApiResponse::success(items)))
}
