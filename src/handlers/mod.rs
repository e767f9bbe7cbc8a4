pub mod accounts;
pub mod auth;
pub mod images;
pub mod inventory;
pub mod order_items;
pub mod orders;
pub mod provider_transports;
pub mod purchase_orders;
pub mod shipments;
pub mod substances;

use axum::{http::StatusCode, Json};

use crate::errors::ServiceError;
use crate::ApiResponse;

/// Turns a missing row into a 404.
pub(crate) fn found<T>(row: Option<T>, entity: &str, id: i32) -> Result<T, ServiceError> {
    row.ok_or_else(|| ServiceError::not_found(entity, id))
}

pub(crate) fn created<T>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}
