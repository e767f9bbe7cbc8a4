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
use crate::entities::substance::{self, Entity as SubstanceEntity, Model as SubstanceModel};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewSubstance {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    #[validate(custom = "validate_amount")]
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSubstance {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[validate(custom = "validate_amount")]
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct SubstanceFilter {
    pub provider_id: Option<i32>,
    pub category: Option<String>,
}

#[derive(Clone)]
pub struct SubstanceService {
    db: Arc<DbPool>,
    retry: CreateRetryConfig,
}

impl SubstanceService {
    pub fn new(db: Arc<DbPool>, retry: CreateRetryConfig) -> Self {
        Self { db, retry }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(
        &self,
        provider_id: i32,
        request: NewSubstance,
    ) -> Result<SubstanceModel, ServiceError> {
        request.validate()?;
        let model = substance::ActiveModel {
            provider_id: Set(provider_id),
            name: Set(request.name),
            description: Set(request.description),
            category: Set(request.category),
            unit_price: Set(round_money(request.unit_price)),
            ..Default::default()
        };
        let created = insert_with_retry(&*self.db, model, self.retry).await?;
        info!(substance_id = created.id, provider_id, "Substance created");
        Ok(created)
    }

    pub async fn get(&self, id: i32) -> Result<Option<SubstanceModel>, ServiceError> {
        Ok(SubstanceEntity::find_by_id(id).one(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: SubstanceFilter,
        page: u64,
        limit: u64,
    ) -> Result<Page<SubstanceModel>, ServiceError> {
        let mut select = SubstanceEntity::find().order_by_asc(substance::Column::Id);
        if let Some(provider_id) = filter.provider_id {
            select = select.filter(substance::Column::ProviderId.eq(provider_id));
        }
        if let Some(category) = filter.category {
            select = select.filter(substance::Column::Category.eq(category));
        }
        fetch_page(&self.db, select, page, limit).await
    }

    #[instrument(skip(self, existing, request), fields(substance_id = existing.id))]
    pub async fn update(
        &self,
        existing: SubstanceModel,
        request: UpdateSubstance,
    ) -> Result<SubstanceModel, ServiceError> {
        request.validate()?;
        let mut model = existing.into_active_model();
        if let Some(name) = request.name {
            model.name = Set(name);
        }
        if request.description.is_some() {
            model.description = Set(request.description);
        }
        if request.category.is_some() {
            model.category = Set(request.category);
        }
        if let Some(price) = request.unit_price {
            model.unit_price = Set(round_money(price));
        }
        let updated = model
            .update(&*self.db)
            .await
            .map_err(|e| ServiceError::from_write(e, "substances"))?;
        info!("Substance updated");
        Ok(updated)
    }

    /// Substances still stocked, ordered or purchased cannot be removed.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let result = SubstanceEntity::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(|e| ServiceError::from_write(e, "substances"))?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Substance", id));
        }
        info!(substance_id = id, "Substance deleted");
        Ok(())
    }
}
