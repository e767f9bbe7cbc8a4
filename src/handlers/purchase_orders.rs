use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};

use super::{created, found};
use crate::auth::{gate, Action, Actor, Resource};
use crate::entities::purchase_order::Model as PurchaseOrder;
use crate::errors::ServiceError;
use crate::services::purchase_orders::{
    NewPurchaseOrder, UpdatePurchaseOrder, UpdatePurchaseOrderStatus,
};
use crate::{ApiResponse, ApiResult, AppState, Deleted, ListQuery, PaginatedResponse};

async fn load_purchase_order(state: &AppState, id: i32) -> Result<PurchaseOrder, ServiceError> {
    found(
        state.services.purchase_orders.get(id).await?,
        "Purchase order",
        id,
    )
}

#[utoipa::path(
    get,
    path = "/api/purchase-orders",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of purchase orders", body = PaginatedResponse<PurchaseOrder>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Customers have no purchase orders", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "purchase-orders"
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<PurchaseOrder>> {
    gate(&actor, Resource::PurchaseOrder, Action::List, None)?;
    let (page, limit) = query.normalized();
    let orders = state
        .services
        .purchase_orders
        .list_for(&actor, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(orders.into())))
}

/// Dealer restock order. `total_cost = quantity_ordered * unit_cost + transport_cost`,
/// with the transport cost copied from the chosen transport.
#[utoipa::path(
    post,
    path = "/api/purchase-orders",
    request_body = NewPurchaseOrder,
    responses(
        (status = 201, description = "Purchase order created", body = PurchaseOrder),
        (status = 400, description = "Invalid purchase order", body = crate::errors::ErrorResponse),
        (status = 403, description = "Only dealers place purchase orders", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "purchase-orders"
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<NewPurchaseOrder>,
) -> Result<impl IntoResponse, ServiceError> {
    gate(&actor, Resource::PurchaseOrder, Action::Create, None)?;
    let po = state
        .services
        .purchase_orders
        .create(actor.id, payload)
        .await?;
    Ok(created(po))
}

#[utoipa::path(
    get,
    path = "/api/purchase-orders/{id}",
    params(("id" = i32, Path, description = "Purchase order id")),
    responses(
        (status = 200, description = "Purchase order", body = PurchaseOrder),
        (status = 403, description = "Not a party to the purchase order", body = crate::errors::ErrorResponse),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
) -> ApiResult<PurchaseOrder> {
    let po = load_purchase_order(&state, id).await?;
    gate(&actor, Resource::PurchaseOrder, Action::Read, Some(&po))?;
    Ok(Json(ApiResponse::success(po)))
}

#[utoipa::path(
    put,
    path = "/api/purchase-orders/{id}",
    params(("id" = i32, Path, description = "Purchase order id")),
    request_body = UpdatePurchaseOrder,
    responses(
        (status = 200, description = "Purchase order updated", body = PurchaseOrder),
        (status = 400, description = "Invalid input or no longer pending", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the ordering dealer", body = crate::errors::ErrorResponse),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "purchase-orders"
)]
pub async fn update_purchase_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
    Json(payload): Json<UpdatePurchaseOrder>,
) -> ApiResult<PurchaseOrder> {
    let po = load_purchase_order(&state, id).await?;
    gate(&actor, Resource::PurchaseOrder, Action::Update, Some(&po))?;
    let updated = state.services.purchase_orders.update(id, payload).await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[utoipa::path(
    put,
    path = "/api/purchase-orders/{id}/status",
    params(("id" = i32, Path, description = "Purchase order id")),
    request_body = UpdatePurchaseOrderStatus,
    responses(
        (status = 200, description = "Status updated", body = PurchaseOrder),
        (status = 400, description = "No status supplied", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the supplying provider", body = crate::errors::ErrorResponse),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "purchase-orders"
)]
pub async fn update_purchase_order_status(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
    Json(payload): Json<UpdatePurchaseOrderStatus>,
) -> ApiResult<PurchaseOrder> {
    let po = load_purchase_order(&state, id).await?;
    gate(&actor, Resource::PurchaseOrder, Action::UpdateStatus, Some(&po))?;
    let updated = state
        .services
        .purchase_orders
        .update_status(po, payload)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/purchase-orders/{id}",
    params(("id" = i32, Path, description = "Purchase order id")),
    responses(
        (status = 200, description = "Purchase order deleted", body = Deleted),
        (status = 400, description = "No longer pending", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the ordering dealer", body = crate::errors::ErrorResponse),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "purchase-orders"
)]
pub async fn delete_purchase_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
) -> ApiResult<Deleted> {
    let po = load_purchase_order(&state, id).await?;
    gate(&actor, Resource::PurchaseOrder, Action::Delete, Some(&po))?;
    state.services.purchase_orders.delete(po).await?;
    Ok(Json(ApiResponse::success(Deleted { id })))
}
