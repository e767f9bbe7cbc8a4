/*!
 * # Health Check Module
 *
 * - Liveness (`/health`): the process is up and serving.
 * - Readiness (`/health/ready`): the database answers a ping.
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::error;

use crate::AppState;

static STARTED: Lazy<Instant> = Lazy::new(Instant::now);

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<HealthStatus>,
}

impl HealthInfo {
    fn now(status: HealthStatus, database: Option<HealthStatus>) -> Self {
        Self {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            uptime_seconds: STARTED.elapsed().as_secs(),
            database,
        }
    }
}

pub fn health_routes() -> Router<AppState> {
    Lazy::force(&STARTED);
    Router::new()
        .route("/health", get(liveness))
        .route("/health/ready", get(readiness))
}

async fn liveness() -> impl IntoResponse {
    Json(HealthInfo::now(HealthStatus::Up, None))
}

async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match crate::db::check_connection(&state.db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthInfo::now(HealthStatus::Up, Some(HealthStatus::Up))),
        ),
        Err(e) => {
            error!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthInfo::now(HealthStatus::Down, Some(HealthStatus::Down))),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn liveness_body_omits_database() {
        let body = serde_json::to_value(HealthInfo::now(HealthStatus::Up, None)).unwrap();
        assert_eq!(body["status"], "up");
        assert!(body.get("database").is_none());
    }
}
