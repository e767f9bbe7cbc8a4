use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, IntoActiveModel,
    QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::db::{insert_with_retry, CreateRetryConfig, DbPool};
use crate::entities::{
    order::{self, Model as OrderModel, OrderStatus},
    shipment::{self, order_status_for, Entity as ShipmentEntity, Model as ShipmentModel, ShipmentStatus},
};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewShipment {
    pub order_id: i32,
    #[validate(length(min = 1, max = 64))]
    pub carrier: String,
    #[validate(length(max = 128))]
    pub tracking_number: Option<String>,
    /// Defaults to `preparing`.
    pub status: Option<ShipmentStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateShipment {
    #[validate(length(min = 1, max = 64))]
    pub carrier: Option<String>,
    #[validate(length(max = 128))]
    pub tracking_number: Option<String>,
    pub status: Option<ShipmentStatus>,
}

/// A shipment write and the order status it implied.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ShipmentChange {
    pub shipment: ShipmentModel,
    pub order_status: OrderStatus,
}

/// Overwrites the order's status from the shipment's. There is no check that
/// the transition makes sense; a shipment moved back to `preparing` moves a
/// delivered order back to `processing`.
async fn propagate_status(
    txn: &DatabaseTransaction,
    order: OrderModel,
    status: ShipmentStatus,
) -> Result<OrderStatus, ServiceError> {
    let next = order_status_for(Some(status));
    let previous = order.order_status;
    let mut model = order.into_active_model();
    model.order_status = Set(next);
    let order = model.update(txn).await?;
    info!(order_id = order.id, from = %previous, to = %next, "Order status follows shipment");
    Ok(next)
}

/// Delivery records, at most one per order.
#[derive(Clone)]
pub struct ShipmentService {
    db: Arc<DbPool>,
    retry: CreateRetryConfig,
}

impl ShipmentService {
    pub fn new(db: Arc<DbPool>, retry: CreateRetryConfig) -> Self {
        Self { db, retry }
    }

    pub async fn get(&self, id: i32) -> Result<Option<ShipmentModel>, ServiceError> {
        Ok(ShipmentEntity::find_by_id(id).one(&*self.db).await?)
    }

    pub async fn for_order(&self, order_id: i32) -> Result<Option<ShipmentModel>, ServiceError> {
        Ok(ShipmentEntity::find()
            .filter(shipment::Column::OrderId.eq(order_id))
            .one(&*self.db)
            .await?)
    }

    /// A second shipment for the same order is a `DuplicateField` on `order_id`.
    #[instrument(skip(self, request), fields(order_id = request.order_id))]
    pub async fn create(&self, request: NewShipment) -> Result<ShipmentChange, ServiceError> {
        request.validate()?;
        let status = request.status.unwrap_or(ShipmentStatus::Preparing);
        let txn = self.db.begin().await?;

        let order = load_order(&txn, request.order_id).await?;
        let created = insert_with_retry(
            &txn,
            shipment::ActiveModel {
                order_id: Set(request.order_id),
                carrier: Set(request.carrier),
                tracking_number: Set(request.tracking_number),
                status: Set(status),
                ..Default::default()
            },
            self.retry,
        )
        .await?;
        let order_status = propagate_status(&txn, order, status).await?;
        txn.commit().await?;

        info!(shipment_id = created.id, "Shipment created");
        Ok(ShipmentChange {
            shipment: created,
            order_status,
        })
    }

    /// Every update re-applies the status mapping, even when the status is unchanged.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: i32,
        request: UpdateShipment,
    ) -> Result<ShipmentChange, ServiceError> {
        request.validate()?;
        let txn = self.db.begin().await?;

        let existing = ShipmentEntity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Shipment", id))?;
        let order = load_order(&txn, existing.order_id).await?;
        let status = request.status.unwrap_or(existing.status);

        let mut model = existing.into_active_model();
        if let Some(carrier) = request.carrier {
            model.carrier = Set(carrier);
        }
        if request.tracking_number.is_some() {
            model.tracking_number = Set(request.tracking_number);
        }
        model.status = Set(status);
        let updated = model.update(&txn).await?;
        let order_status = propagate_status(&txn, order, status).await?;
        txn.commit().await?;

        info!(shipment_id = id, status = ?status, "Shipment updated");
        Ok(ShipmentChange {
            shipment: updated,
            order_status,
        })
    }

    /// The order keeps whatever status the shipment last gave it.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let result = ShipmentEntity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Shipment", id));
        }
        info!(shipment_id = id, "Shipment deleted");
        Ok(())
    }
}

async fn load_order(txn: &DatabaseTransaction, order_id: i32) -> Result<OrderModel, ServiceError> {
    order::Entity::find_by_id(order_id)
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Order", order_id))
}
