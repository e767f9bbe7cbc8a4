//! Line items are authorized against their parent order: the customer who
//! placed it may change them, and either party may read them.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

use super::{created, found};
use crate::auth::{gate, Action, Actor, Resource};
use crate::entities::{order::Model as Order, order_item::Model as OrderItem};
use crate::errors::ServiceError;
use crate::services::order_items::{ItemChange, NewOrderItem, UpdateOrderItem};
use crate::{ApiResponse, ApiResult, AppState};

async fn load_item_and_order(
    state: &AppState,
    id: i32,
) -> Result<(OrderItem, Order), ServiceError> {
    let item = found(state.services.order_items.get(id).await?, "Order item", id)?;
    let order = found(
        state.services.orders.get(item.order_id).await?,
        "Order",
        item.order_id,
    )?;
    Ok((item, order))
}

#[utoipa::path(
    post,
    path = "/api/order-items",
    request_body = NewOrderItem,
    responses(
        (status = 201, description = "Item added; body carries the new order total", body = ItemChange),
        (status = 400, description = "Invalid item or order no longer pending", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the ordering customer", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "order-items"
)]
pub async fn create_order_item(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<NewOrderItem>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = found(
        state.services.orders.get(payload.order_id).await?,
        "Order",
        payload.order_id,
    )?;
    gate(&actor, Resource::OrderItem, Action::Create, Some(&order))?;
    let change = state.services.order_items.create(payload).await?;
    Ok(created(change))
}

#[utoipa::path(
    get,
    path = "/api/order-items/{id}",
    params(("id" = i32, Path, description = "Order item id")),
    responses(
        (status = 200, description = "Order item", body = OrderItem),
        (status = 403, description = "Not a party to the order", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "order-items"
)]
pub async fn get_order_item(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
) -> ApiResult<OrderItem> {
    let (item, order) = load_item_and_order(&state, id).await?;
    gate(&actor, Resource::OrderItem, Action::Read, Some(&order))?;
    Ok(Json(ApiResponse::success(item)))
}

#[utoipa::path(
    put,
    path = "/api/order-items/{id}",
    params(("id" = i32, Path, description = "Order item id")),
    request_body = UpdateOrderItem,
    responses(
        (status = 200, description = "Item updated; body carries the new order total", body = ItemChange),
        (status = 400, description = "Invalid input or order no longer pending", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the ordering customer", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "order-items"
)]
pub async fn update_order_item(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateOrderItem>,
) -> ApiResult<ItemChange> {
    let (_, order) = load_item_and_order(&state, id).await?;
    gate(&actor, Resource::OrderItem, Action::Update, Some(&order))?;
    let change = state.services.order_items.update(id, payload).await?;
    Ok(Json(ApiResponse::success(change)))
}

#[utoipa::path(
    delete,
    path = "/api/order-items/{id}",
    params(("id" = i32, Path, description = "Order item id")),
    responses(
        (status = 200, description = "Item removed; body carries the new order total", body = ItemChange),
        (status = 400, description = "Order no longer pending", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the ordering customer", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "order-items"
)]
pub async fn delete_order_item(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
) -> ApiResult<ItemChange> {
    let (_, order) = load_item_and_order(&state, id).await?;
    gate(&actor, Resource::OrderItem, Action::Delete, Some(&order))?;
    let change = state.services.order_items.delete(id).await?;
    Ok(Json(ApiResponse::success(change)))
}
