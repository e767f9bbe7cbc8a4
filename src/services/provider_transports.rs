use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{
    fetch_page,
    pricing::{round_money, validate_amount},
    Page,
};
use crate::db::{insert_with_retry, CreateRetryConfig, DbPool};
use crate::entities::provider_transport::{
    self, Entity as TransportEntity, Model as TransportModel,
};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewProviderTransport {
    #[validate(length(min = 1, max = 64))]
    pub transport_mode: String,
    #[validate(custom = "validate_amount")]
    pub transport_cost: Decimal,
    #[validate(range(min = 0))]
    pub estimated_days: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProviderTransport {
    #[validate(length(min = 1, max = 64))]
    pub transport_mode: Option<String>,
    #[validate(custom = "validate_amount")]
    pub transport_cost: Option<Decimal>,
    #[validate(range(min = 0))]
    pub estimated_days: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct TransportFilter {
    pub provider_id: Option<i32>,
}

/// Shipping options providers offer for purchase orders.
#[derive(Clone)]
pub struct ProviderTransportService {
    db: Arc<DbPool>,
    retry: CreateRetryConfig,
}

impl ProviderTransportService {
    pub fn new(db: Arc<DbPool>, retry: CreateRetryConfig) -> Self {
        Self { db, retry }
    }

    #[instrument(skip(self, request))]
    pub async fn create(
        &self,
        provider_id: i32,
        request: NewProviderTransport,
    ) -> Result<TransportModel, ServiceError> {
        request.validate()?;
        let model = provider_transport::ActiveModel {
            provider_id: Set(provider_id),
            transport_mode: Set(request.transport_mode),
            transport_cost: Set(round_money(request.transport_cost)),
            estimated_days: Set(request.estimated_days),
            ..Default::default()
        };
        let created = insert_with_retry(&*self.db, model, self.retry).await?;
        info!(transport_id = created.id, provider_id, "Provider transport created");
        Ok(created)
    }

    pub async fn get(&self, id: i32) -> Result<Option<TransportModel>, ServiceError> {
        Ok(TransportEntity::find_by_id(id).one(&*self.db).await?)
    }

    pub async fn list(
        &self,
        filter: TransportFilter,
        page: u64,
        limit: u64,
    ) -> Result<Page<TransportModel>, ServiceError> {
        let mut select = TransportEntity::find().order_by_asc(provider_transport::Column::Id);
        if let Some(provider_id) = filter.provider_id {
            select = select.filter(provider_transport::Column::ProviderId.eq(provider_id));
        }
        fetch_page(&self.db, select, page, limit).await
    }

    /// Cost changes do not touch purchase orders already placed; they keep
    /// the cost copied at creation.
    #[instrument(skip(self, existing, request), fields(transport_id = existing.id))]
    pub async fn update(
        &self,
        existing: TransportModel,
        request: UpdateProviderTransport,
    ) -> Result<TransportModel, ServiceError> {
        request.validate()?;
        let mut model = existing.into_active_model();
        if let Some(mode) = request.transport_mode {
            model.transport_mode = Set(mode);
        }
        if let Some(cost) = request.transport_cost {
            model.transport_cost = Set(round_money(cost));
        }
        if request.estimated_days.is_some() {
            model.estimated_days = Set(request.estimated_days);
        }
        let updated = model
            .update(&*self.db)
            .await
            .map_err(|e| ServiceError::from_write(e, "provider_transports"))?;
        info!("Provider transport updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let result = TransportEntity::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(|e| ServiceError::from_write(e, "provider_transports"))?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Provider transport", id));
        }
        info!(transport_id = id, "Provider transport deleted");
        Ok(())
    }
}
