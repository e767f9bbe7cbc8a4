use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};

use super::{created, found};
use crate::auth::{gate, Action, Actor, Resource};
use crate::entities::substance::Model as Substance;
use crate::errors::ServiceError;
use crate::services::substances::{NewSubstance, SubstanceFilter, UpdateSubstance};
use crate::{ApiResponse, ApiResult, AppState, Deleted, ListQuery, PaginatedResponse};

pub async fn list_substances(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<SubstanceFilter>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<Substance>> {
    gate(&actor, Resource::Substance, Action::List, None)?;
    let (page, limit) = query.normalized();
    let substances = state.services.substances.list(filter, page, limit).await?;
    Ok(Json(ApiResponse::success(substances.into())))
}

/// Providers list substances under their own id.
pub async fn create_substance(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<NewSubstance>,
) -> Result<impl IntoResponse, ServiceError> {
    gate(&actor, Resource::Substance, Action::Create, None)?;
    let substance = state.services.substances.create(actor.id, payload).await?;
    Ok(created(substance))
}

pub async fn get_substance(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
) -> ApiResult<Substance> {
    let substance = found(state.services.substances.get(id).await?, "Substance", id)?;
    gate(&actor, Resource::Substance, Action::Read, Some(&substance))?;
    Ok(Json(ApiResponse::success(substance)))
}

pub async fn update_substance(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateSubstance>,
) -> ApiResult<Substance> {
    let substance = found(state.services.substances.get(id).await?, "Substance", id)?;
    gate(&actor, Resource::Substance, Action::Update, Some(&substance))?;
    let updated = state.services.substances.update(substance, payload).await?;
    Ok(Json(ApiResponse::success(updated)))
}

pub async fn delete_substance(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
) -> ApiResult<Deleted> {
    let substance = found(state.services.substances.get(id).await?, "Substance", id)?;
    gate(&actor, Resource::Substance, Action::Delete, Some(&substance))?;
    state.services.substances.delete(id).await?;
    Ok(Json(ApiResponse::success(Deleted { id })))
}
