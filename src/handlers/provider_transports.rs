use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};

use super::{created, found};
use crate::auth::{gate, Action, Actor, Resource};
use crate::entities::provider_transport::Model as ProviderTransport;
use crate::errors::ServiceError;
use crate::services::provider_transports::{
    NewProviderTransport, TransportFilter, UpdateProviderTransport,
};
use crate::{ApiResponse, ApiResult, AppState, Deleted, ListQuery, PaginatedResponse};

const LABEL: &str = "Provider transport";

pub async fn list_transports(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<TransportFilter>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<ProviderTransport>> {
    gate(&actor, Resource::ProviderTransport, Action::List, None)?;
    let (page, limit) = query.normalized();
    let transports = state.services.transports.list(filter, page, limit).await?;
    Ok(Json(ApiResponse::success(transports.into())))
}

pub async fn create_transport(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<NewProviderTransport>,
) -> Result<impl IntoResponse, ServiceError> {
    gate(&actor, Resource::ProviderTransport, Action::Create, None)?;
    let transport = state.services.transports.create(actor.id, payload).await?;
    Ok(created(transport))
}

pub async fn get_transport(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
) -> ApiResult<ProviderTransport> {
    let transport = found(state.services.transports.get(id).await?, LABEL, id)?;
    gate(&actor, Resource::ProviderTransport, Action::Read, Some(&transport))?;
    Ok(Json(ApiResponse::success(transport)))
}

/// A new cost applies to purchase orders created afterwards; existing ones
/// keep the cost they copied.
pub async fn update_transport(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProviderTransport>,
) -> ApiResult<ProviderTransport> {
    let transport = found(state.services.transports.get(id).await?, LABEL, id)?;
    gate(&actor, Resource::ProviderTransport, Action::Update, Some(&transport))?;
    let updated = state.services.transports.update(transport, payload).await?;
    Ok(Json(ApiResponse::success(updated)))
}

pub async fn delete_transport(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
) -> ApiResult<Deleted> {
    let transport = found(state.services.transports.get(id).await?, LABEL, id)?;
    gate(&actor, Resource::ProviderTransport, Action::Delete, Some(&transport))?;
    state.services.transports.delete(id).await?;
    Ok(Json(ApiResponse::success(Deleted { id })))
}
