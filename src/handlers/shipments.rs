//! Shipments belong to an order; the fulfilling dealer writes them and both
//! parties to the order can read them. Every write re-derives the order status.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

use super::{created, found};
use crate::auth::{gate, Action, Actor, Resource};
use crate::entities::{order::Model as Order, shipment::Model as Shipment};
use crate::errors::ServiceError;
use crate::services::shipments::{NewShipment, ShipmentChange, UpdateShipment};
use crate::{ApiResponse, ApiResult, AppState, Deleted};

async fn load_order(state: &AppState, id: i32) -> Result<Order, ServiceError> {
    found(state.services.orders.get(id).await?, "Order", id)
}

async fn load_shipment_and_order(
    state: &AppState,
    id: i32,
) -> Result<(Shipment, Order), ServiceError> {
    let shipment = found(state.services.shipments.get(id).await?, "Shipment", id)?;
    let order = load_order(state, shipment.order_id).await?;
    Ok((shipment, order))
}

#[utoipa::path(
    post,
    path = "/api/shipments",
    request_body = NewShipment,
    responses(
        (status = 201, description = "Shipment created and order status updated", body = ShipmentChange),
        (status = 400, description = "Invalid input or order already has a shipment", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the fulfilling dealer", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn create_shipment(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<NewShipment>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = load_order(&state, payload.order_id).await?;
    gate(&actor, Resource::Shipment, Action::Create, Some(&order))?;
    let change = state.services.shipments.create(payload).await?;
    Ok(created(change))
}

#[utoipa::path(
    get,
    path = "/api/shipments/{id}",
    params(("id" = i32, Path, description = "Shipment id")),
    responses(
        (status = 200, description = "Shipment", body = Shipment),
        (status = 403, description = "Not a party to the order", body = crate::errors::ErrorResponse),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn get_shipment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
) -> ApiResult<Shipment> {
    let (shipment, order) = load_shipment_and_order(&state, id).await?;
    gate(&actor, Resource::Shipment, Action::Read, Some(&order))?;
    Ok(Json(ApiResponse::success(shipment)))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}/shipment",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Shipment of the order", body = Shipment),
        (status = 403, description = "Not a party to the order", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order or shipment not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn get_order_shipment(
    State(state): State<AppState>,
    actor: Actor,
    Path(order_id): Path<i32>,
) -> ApiResult<Shipment> {
    let order = load_order(&state, order_id).await?;
    gate(&actor, Resource::Shipment, Action::Read, Some(&order))?;
    let shipment = state
        .services
        .shipments
        .for_order(order_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} has no shipment", order_id)))?;
    Ok(Json(ApiResponse::success(shipment)))
}

#[utoipa::path(
    put,
    path = "/api/shipments/{id}",
    params(("id" = i32, Path, description = "Shipment id")),
    request_body = UpdateShipment,
    responses(
        (status = 200, description = "Shipment updated and order status re-derived", body = ShipmentChange),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the fulfilling dealer", body = crate::errors::ErrorResponse),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn update_shipment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateShipment>,
) -> ApiResult<ShipmentChange> {
    let (_, order) = load_shipment_and_order(&state, id).await?;
    gate(&actor, Resource::Shipment, Action::Update, Some(&order))?;
    let change = state.services.shipments.update(id, payload).await?;
    Ok(Json(ApiResponse::success(change)))
}

#[utoipa::path(
    delete,
    path = "/api/shipments/{id}",
    params(("id" = i32, Path, description = "Shipment id")),
    responses(
        (status = 200, description = "Shipment deleted; order status is left as is", body = Deleted),
        (status = 403, description = "Not the fulfilling dealer", body = crate::errors::ErrorResponse),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "shipments"
)]
pub async fn delete_shipment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
) -> ApiResult<Deleted> {
    let (_, order) = load_shipment_and_order(&state, id).await?;
    gate(&actor, Resource::Shipment, Action::Delete, Some(&order))?;
    state.services.shipments.delete(id).await?;
    Ok(Json(ApiResponse::success(Deleted { id })))
}
