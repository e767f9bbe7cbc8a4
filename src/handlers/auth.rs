use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use super::{created, found};
use crate::auth::{Actor, ActorKind, Claims};
use crate::errors::ServiceError;
use crate::services::accounts::{Account, RegisterAccount};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    pub kind: ActorKind,
    /// Username or email.
    #[validate(length(min = 1))]
    pub login: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    /// Seconds until the token expires.
    pub expires_in: i64,
    pub account: Account,
}

#[utoipa::path(
    post,
    path = "/api/auth/register/{kind}",
    params(("kind" = ActorKind, Path, description = "customer, dealer or provider")),
    request_body = RegisterAccount,
    responses(
        (status = 201, description = "Account created", body = Account),
        (status = 400, description = "Invalid input or username/email taken", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Path(kind): Path<ActorKind>,
    Json(payload): Json<RegisterAccount>,
) -> Result<impl IntoResponse, ServiceError> {
    let account = state.services.accounts.register(kind, payload).await?;
    Ok(created(account))
}

/// Issues a session token, returned in the body and as an HttpOnly cookie.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse,
            headers(("Set-Cookie" = String, description = "Session cookie"))
        ),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;
    let account = state
        .services
        .accounts
        .authenticate(payload.kind, &payload.login, &payload.password)
        .await?;

    let actor = Actor {
        id: account.id,
        kind: account.kind,
        username: account.username.clone(),
    };
    let issued = state.auth.issue_token(&actor)?;
    let cookie = state.auth.session_cookie(&issued.token);

    let body = LoginResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_in: issued.expires_in,
        account,
    };
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::success(body)),
    ))
}

/// Revokes the presented token and clears the session cookie.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn logout(State(state): State<AppState>, claims: Claims) -> impl IntoResponse {
    state.auth.revoke(&claims).await;
    info!(sub = %claims.sub, kind = %claims.kind, "Logged out");
    (
        StatusCode::OK,
        [(header::SET_COOKIE, state.auth.clear_cookie())],
        Json(ApiResponse::success(()).with_message("logged out")),
    )
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "The authenticated account", body = Account),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Account no longer exists", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn me(State(state): State<AppState>, actor: Actor) -> ApiResult<Account> {
    let account = state.services.accounts.get(actor.kind, actor.id).await?;
    Ok(Json(ApiResponse::success(found(account, "Account", actor.id)?)))
}
