//! Profile endpoints for the three account tables. The handlers are identical
//! apart from the table they address, so they are generated per kind.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::found;
use crate::auth::{gate, Action, Actor, ActorKind, Resource};
use crate::services::accounts::{Account, UpdateAccount};
use crate::{ApiResponse, ApiResult, AppState, Deleted, ListQuery, PaginatedResponse};

macro_rules! account_handlers {
    ($kind:expr, $resource:expr, $label:literal, $get:ident, $update:ident, $delete:ident) => {
        pub async fn $get(
            State(state): State<AppState>,
            actor: Actor,
            Path(id): Path<i32>,
        ) -> ApiResult<Account> {
            let account = found(state.services.accounts.get($kind, id).await?, $label, id)?;
            gate(&actor, $resource, Action::Read, Some(&account))?;
            Ok(Json(ApiResponse::success(account)))
        }

        pub async fn $update(
            State(state): State<AppState>,
            actor: Actor,
            Path(id): Path<i32>,
            Json(payload): Json<UpdateAccount>,
        ) -> ApiResult<Account> {
            let account = found(state.services.accounts.get($kind, id).await?, $label, id)?;
            gate(&actor, $resource, Action::Update, Some(&account))?;
            let updated = state.services.accounts.update($kind, id, payload).await?;
            Ok(Json(ApiResponse::success(updated)))
        }

        pub async fn $delete(
            State(state): State<AppState>,
            actor: Actor,
            Path(id): Path<i32>,
        ) -> ApiResult<Deleted> {
            let account = found(state.services.accounts.get($kind, id).await?, $label, id)?;
            gate(&actor, $resource, Action::Delete, Some(&account))?;
            state.services.accounts.delete($kind, id).await?;
            Ok(Json(ApiResponse::success(Deleted { id })))
        }
    };
}

account_handlers!(
    ActorKind::Customer,
    Resource::Customer,
    "Customer",
    get_customer,
    update_customer,
    delete_customer
);
account_handlers!(
    ActorKind::Dealer,
    Resource::Dealer,
    "Dealer",
    get_dealer,
    update_dealer,
    delete_dealer
);
account_handlers!(
    ActorKind::Provider,
    Resource::Provider,
    "Provider",
    get_provider,
    update_provider,
    delete_provider
);

/// Dealer directory, open to every signed-in actor.
pub async fn list_dealers(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<Account>> {
    gate(&actor, Resource::Dealer, Action::List, None)?;
    let (page, limit) = query.normalized();
    let accounts = state
        .services
        .accounts
        .list(ActorKind::Dealer, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(accounts.into())))
}

pub async fn list_providers(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<ListQuery>,
) -> ApiResult<PaginatedResponse<Account>> {
    gate(&actor, Resource::Provider, Action::List, None)?;
    let (page, limit) = query.normalized();
    let accounts = state
        .services
        .accounts
        .list(ActorKind::Provider, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(accounts.into())))
}
