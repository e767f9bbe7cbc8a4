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
use crate::entities::inventory::{self, Entity as InventoryEntity, Model as InventoryModel};
use crate::entities::substance::Entity as SubstanceEntity;
use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewInventory {
    pub substance_id: i32,
    #[validate(range(min = 0))]
    pub quantity_available: i32,
    #[validate(custom = "validate_amount")]
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateInventory {
    #[validate(range(min = 0))]
    pub quantity_available: Option<i32>,
    #[validate(custom = "validate_amount")]
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct InventoryFilter {
    pub dealer_id: Option<i32>,
    pub substance_id: Option<i32>,
}

/// A dealer's stock, one row per (dealer, substance).
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DbPool>,
    retry: CreateRetryConfig,
}

impl InventoryService {
    pub fn new(db: Arc<DbPool>, retry: CreateRetryConfig) -> Self {
        Self { db, retry }
    }

    /// A second row for the same substance is a `DuplicateField`.
    #[instrument(skip(self, request), fields(substance_id = request.substance_id))]
    pub async fn create(
        &self,
        dealer_id: i32,
        request: NewInventory,
    ) -> Result<InventoryModel, ServiceError> {
        request.validate()?;
        if SubstanceEntity::find_by_id(request.substance_id)
            .one(&*self.db)
            .await?
            .is_none()
        {
            return Err(ServiceError::InvalidInput(format!(
                "substance {} does not exist",
                request.substance_id
            )));
        }

        let model = inventory::ActiveModel {
            dealer_id: Set(dealer_id),
            substance_id: Set(request.substance_id),
            quantity_available: Set(request.quantity_available),
            unit_price: Set(round_money(request.unit_price)),
            ..Default::default()
        };
        let created = insert_with_retry(&*self.db, model, self.retry).await?;
        info!(inventory_id = created.id, dealer_id, "Inventory created");
        Ok(created)
    }

    pub async fn get(&self, id: i32) -> Result<Option<InventoryModel>, ServiceError> {
        Ok(InventoryEntity::find_by_id(id).one(&*self.db).await?)
    }

    pub async fn list(
        &self,
        filter: InventoryFilter,
        page: u64,
        limit: u64,
    ) -> Result<Page<InventoryModel>, ServiceError> {
        let mut select = InventoryEntity::find().order_by_asc(inventory::Column::Id);
        if let Some(dealer_id) = filter.dealer_id {
            select = select.filter(inventory::Column::DealerId.eq(dealer_id));
        }
        if let Some(substance_id) = filter.substance_id {
            select = select.filter(inventory::Column::SubstanceId.eq(substance_id));
        }
        fetch_page(&self.db, select, page, limit).await
    }

    #[instrument(skip(self, existing, request), fields(inventory_id = existing.id))]
    pub async fn update(
        &self,
        existing: InventoryModel,
        request: UpdateInventory,
    ) -> Result<InventoryModel, ServiceError> {
        request.validate()?;
        let mut model = existing.into_active_model();
        if let Some(quantity) = request.quantity_available {
            model.quantity_available = Set(quantity);
        }
        if let Some(price) = request.unit_price {
            model.unit_price = Set(round_money(price));
        }
        let updated = model
            .update(&*self.db)
            .await
            .map_err(|e| ServiceError::from_write(e, "inventory"))?;
        info!("Inventory updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let result = InventoryEntity::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(|e| ServiceError::from_write(e, "inventory"))?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Inventory", id));
        }
        info!(inventory_id = id, "Inventory deleted");
        Ok(())
    }
}
