use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};

use super::{created, found};
use crate::auth::{gate, Action, Actor, Resource};
use crate::entities::inventory::Model as Inventory;
use crate::errors::ServiceError;
use crate::services::inventory::{InventoryFilter, NewInventory, UpdateInventory};
use crate::{ApiResponse, ApiResult, AppState, Deleted, ListQuery, PaginatedResponse};

pub async fn list_inventory(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<InventoryFilter>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<Inventory>> {
    gate(&actor, Resource::Inventory, Action::List, None)?;
    let (page, limit) = query.normalized();
    let rows = state.services.inventory.list(filter, page, limit).await?;
    Ok(Json(ApiResponse::success(rows.into())))
}

/// Dealers stock substances under their own id.
pub async fn create_inventory(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<NewInventory>,
) -> Result<impl IntoResponse, ServiceError> {
    gate(&actor, Resource::Inventory, Action::Create, None)?;
    let row = state.services.inventory.create(actor.id, payload).await?;
    Ok(created(row))
}

pub async fn get_inventory(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
) -> ApiResult<Inventory> {
    let row = found(state.services.inventory.get(id).await?, "Inventory", id)?;
    gate(&actor, Resource::Inventory, Action::Read, Some(&row))?;
    Ok(Json(ApiResponse::success(row)))
}

pub async fn update_inventory(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateInventory>,
) -> ApiResult<Inventory> {
    let row = found(state.services.inventory.get(id).await?, "Inventory", id)?;
    gate(&actor, Resource::Inventory, Action::Update, Some(&row))?;
    let updated = state.services.inventory.update(row, payload).await?;
    Ok(Json(ApiResponse::success(updated)))
}

pub async fn delete_inventory(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
) -> ApiResult<Deleted> {
    let row = found(state.services.inventory.get(id).await?, "Inventory", id)?;
    gate(&actor, Resource::Inventory, Action::Delete, Some(&row))?;
    state.services.inventory.delete(id).await?;
    Ok(Json(ApiResponse::success(Deleted { id })))
}
