/*!
 * # Authentication and Authorization
 *
 * Customers, dealers and providers each log in against their own account
 * table and receive an HS256 JWT. The token is returned in the login body and
 * also set as an HttpOnly session cookie; [`auth_middleware`] accepts either
 * an `Authorization: Bearer` header or that cookie.
 *
 * Authorization decisions live in [`policy`].
 */

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::ServiceError;

pub mod password;
pub mod policy;

pub use password::{hash_password, verify_password};
pub use policy::{authorize, gate, Action, OwnerField, Owned, Resource};

/// The three account tables an actor can belong to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ActorKind {
    Customer,
    Dealer,
    Provider,
}

/// The authenticated caller, placed in request extensions by [`auth_middleware`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Actor {
    pub id: i32,
    pub kind: ActorKind,
    pub username: String,
}

/// JWT claims for a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id within the table named by `kind`
    pub sub: String,
    pub kind: ActorKind,
    pub username: String,
    /// Token id, used for revocation on logout
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn actor(&self) -> Result<Actor, AuthError> {
        let id = self.sub.parse::<i32>().map_err(|_| AuthError::InvalidToken)?;
        Ok(Actor {
            id,
            kind: self.kind,
            username: self.username.clone(),
        })
    }
}

/// A freshly signed token and its lifetime in seconds.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub jti: String,
    pub expires_in: i64,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            jwt_secret: cfg.jwt_secret.clone(),
            token_ttl: Duration::from_secs(cfg.jwt_expiration as u64),
            cookie_name: cfg.session_cookie_name.clone(),
            cookie_secure: cfg.session_cookie_secure,
        }
    }
}

#[derive(Clone, Debug)]
struct RevokedToken {
    jti: String,
    expiry: DateTime<Utc>,
}

/// Issues, validates and revokes session tokens.
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    revoked: Arc<RwLock<Vec<RevokedToken>>>,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            revoked: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn issue_token(&self, actor: &Actor) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let ttl = ChronoDuration::from_std(self.config.token_ttl)
            .map_err(|_| AuthError::TokenCreation("invalid token lifetime".to_string()))?;
        let jti = Uuid::new_v4().to_string();

        let claims = Claims {
            sub: actor.id.to_string(),
            kind: actor.kind,
            username: actor.username.clone(),
            jti: jti.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok(IssuedToken {
            token,
            jti,
            expires_in: ttl.num_seconds(),
        })
    }

    /// Decodes and checks a token, including the revocation list.
    pub async fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        if self.is_revoked(&claims.jti).await {
            return Err(AuthError::RevokedToken);
        }
        Ok(claims)
    }

    /// Blacklists a token id until its natural expiry.
    pub async fn revoke(&self, claims: &Claims) {
        let expiry = DateTime::<Utc>::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);
        let mut revoked = self.revoked.write().await;
        let now = Utc::now();
        revoked.retain(|t| t.expiry > now);
        revoked.push(RevokedToken {
            jti: claims.jti.clone(),
            expiry,
        });
        debug!(jti = %claims.jti, "token revoked");
    }

    async fn is_revoked(&self, jti: &str) -> bool {
        self.revoked.read().await.iter().any(|t| t.jti == jti)
    }

    /// `Set-Cookie` value carrying a session token.
    pub fn session_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
            self.config.cookie_name,
            token,
            self.config.token_ttl.as_secs()
        );
        if self.config.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// `Set-Cookie` value that expires the session cookie.
    pub fn clear_cookie(&self) -> String {
        format!(
            "{}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0",
            self.config.cookie_name
        )
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingAuth,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid authentication token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    RevokedToken,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenCreation(msg) => ServiceError::JwtError(msg),
            other => ServiceError::Unauthorized(other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ServiceError::from(self).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Pulls a session token from the bearer header, falling back to the cookie.
pub fn token_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Rejects unauthenticated requests and exposes [`Actor`] and [`Claims`] to handlers.
pub async fn auth_middleware(
    State(auth): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = token_from_headers(request.headers(), &auth.config.cookie_name) else {
        return AuthError::MissingAuth.into_response();
    };

    let claims = match auth.validate_token(&token).await {
        Ok(claims) => claims,
        Err(e) => {
            warn!(error = %e, "rejected session token");
            return e.into_response();
        }
    };
    let actor = match claims.actor() {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };

    request.extensions_mut().insert(actor);
    request.extensions_mut().insert(claims);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, routing::get, Router};
    use tower::ServiceExt;

    fn service() -> AuthService {
        AuthService::new(AuthConfig {
            jwt_secret: "k3y-f0r-t3sts-0nly-abcdefghijklmnopqrstuvwxyz".to_string(),
            token_ttl: Duration::from_secs(600),
            cookie_name: "marketplace_session".to_string(),
            cookie_secure: false,
        })
    }

    fn dealer() -> Actor {
        Actor {
            id: 4,
            kind: ActorKind::Dealer,
            username: "acme".to_string(),
        }
    }

    #[tokio::test]
    async fn issued_tokens_carry_the_actor() {
        let auth = service();
        let issued = auth.issue_token(&dealer()).unwrap();
        let claims = auth.validate_token(&issued.token).await.unwrap();
        assert_eq!(claims.jti, issued.jti);
        assert_eq!(claims.actor().unwrap(), dealer());
        assert_eq!(issued.expires_in, 600);
    }

    #[tokio::test]
    async fn revoked_tokens_are_rejected() {
        let auth = service();
        let issued = auth.issue_token(&dealer()).unwrap();
        let claims = auth.validate_token(&issued.token).await.unwrap();
        auth.revoke(&claims).await;
        assert!(matches!(
            auth.validate_token(&issued.token).await,
            Err(AuthError::RevokedToken)
        ));
    }

    #[tokio::test]
    async fn tokens_signed_with_another_secret_are_rejected() {
        let other = AuthService::new(AuthConfig {
            jwt_secret: "another-secret-another-secret-another".to_string(),
            ..service().config
        });
        let issued = other.issue_token(&dealer()).unwrap();
        assert!(matches!(
            service().validate_token(&issued.token).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "a=b; marketplace_session=from-cookie".parse().unwrap());
        assert_eq!(
            token_from_headers(&headers, "marketplace_session").as_deref(),
            Some("from-cookie")
        );

        headers.insert(header::AUTHORIZATION, "Bearer from-header".parse().unwrap());
        assert_eq!(
            token_from_headers(&headers, "marketplace_session").as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn session_cookie_attributes() {
        let auth = service();
        let cookie = auth.session_cookie("tok");
        assert!(cookie.starts_with("marketplace_session=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(!cookie.contains("Secure"));
        assert!(auth.clear_cookie().contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn middleware_requires_a_valid_session() {
        let auth = Arc::new(service());
        let token = auth.issue_token(&dealer()).unwrap().token;
        let app = Router::new()
            .route("/me", get(|actor: Actor| async move { actor.username }))
            .layer(axum::middleware::from_fn_with_state(
                auth.clone(),
                auth_middleware,
            ));

        let anonymous = app
            .clone()
            .oneshot(Request::builder().uri("/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let authed = app
            .oneshot(
                Request::builder()
                    .uri("/me")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(authed.status(), StatusCode::OK);
    }
}
