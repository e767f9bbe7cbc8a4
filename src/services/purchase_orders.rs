use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use super::orders::ensure_substance;
use super::{fetch_page, pricing, pricing::validate_amount, Page};
use crate::auth::{Actor, ActorKind};
use crate::db::{insert_with_retry, CreateRetryConfig, DbPool};
use crate::entities::{
    provider_transport,
    purchase_order::{self, Entity as PurchaseOrderEntity, Model as PurchaseOrderModel, PurchaseOrderStatus},
};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewPurchaseOrder {
    pub provider_id: i32,
    pub substance_id: i32,
    pub provider_transport_id: i32,
    #[validate(range(min = 1))]
    pub quantity_ordered: i32,
    /// Defaults to the substance's list price.
    #[validate(custom = "validate_amount")]
    pub unit_cost: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePurchaseOrder {
    #[validate(range(min = 1))]
    pub quantity_ordered: Option<i32>,
    #[validate(custom = "validate_amount")]
    pub unit_cost: Option<Decimal>,
    /// Switching transport re-reads its current cost.
    pub provider_transport_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdatePurchaseOrderStatus {
    pub status: Option<PurchaseOrderStatus>,
    pub payment_status: Option<bool>,
}

fn ensure_pending(po: &PurchaseOrderModel) -> Result<(), ServiceError> {
    if po.status == PurchaseOrderStatus::Pending {
        Ok(())
    } else {
        Err(ServiceError::InvalidOperation(format!(
            "purchase order {} is no longer pending",
            po.id
        )))
    }
}

/// The transport must exist and belong to the provider being ordered from.
async fn load_transport<C: ConnectionTrait>(
    conn: &C,
    transport_id: i32,
    provider_id: i32,
) -> Result<provider_transport::Model, ServiceError> {
    let transport = provider_transport::Entity::find_by_id(transport_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::InvalidInput(format!("provider transport {} does not exist", transport_id))
        })?;
    if transport.provider_id != provider_id {
        return Err(ServiceError::InvalidInput(format!(
            "provider transport {} is not offered by provider {}",
            transport_id, provider_id
        )));
    }
    Ok(transport)
}

/// Dealer restocking orders placed with providers.
#[derive(Clone)]
pub struct PurchaseOrderService {
    db: Arc<DbPool>,
    retry: CreateRetryConfig,
}

impl PurchaseOrderService {
    pub fn new(db: Arc<DbPool>, retry: CreateRetryConfig) -> Self {
        Self { db, retry }
    }

    /// Reads the transport and substance and writes the order in one
    /// transaction, so the copied transport cost matches what was read.
    #[instrument(skip(self, request), fields(provider_id = request.provider_id))]
    pub async fn create(
        &self,
        dealer_id: i32,
        request: NewPurchaseOrder,
    ) -> Result<PurchaseOrderModel, ServiceError> {
        request.validate()?;
        let txn = self.db.begin().await?;

        let transport =
            load_transport(&txn, request.provider_transport_id, request.provider_id).await?;
        let substance = ensure_substance(&txn, request.substance_id).await?;
        if substance.provider_id != request.provider_id {
            return Err(ServiceError::InvalidInput(format!(
                "substance {} is not sold by provider {}",
                substance.id, request.provider_id
            )));
        }

        let unit_cost = pricing::round_money(request.unit_cost.unwrap_or(substance.unit_price));
        let total_cost = pricing::purchase_order_total(
            request.quantity_ordered,
            unit_cost,
            transport.transport_cost,
        )?;

        let created = insert_with_retry(
            &txn,
            purchase_order::ActiveModel {
                dealer_id: Set(dealer_id),
                provider_id: Set(request.provider_id),
                substance_id: Set(request.substance_id),
                provider_transport_id: Set(transport.id),
                quantity_ordered: Set(request.quantity_ordered),
                unit_cost: Set(unit_cost),
                transport_cost: Set(transport.transport_cost),
                total_cost: Set(total_cost),
                payment_status: Set(false),
                status: Set(PurchaseOrderStatus::Pending),
                ..Default::default()
            },
            self.retry,
        )
        .await?;
        txn.commit().await?;

        info!(purchase_order_id = created.id, dealer_id, %total_cost, "Purchase order created");
        Ok(created)
    }

    pub async fn get(&self, id: i32) -> Result<Option<PurchaseOrderModel>, ServiceError> {
        Ok(PurchaseOrderEntity::find_by_id(id).one(&*self.db).await?)
    }

    /// Dealers see what they ordered, providers what was ordered from them.
    pub async fn list_for(
        &self,
        actor: &Actor,
        page: u64,
        limit: u64,
    ) -> Result<Page<PurchaseOrderModel>, ServiceError> {
        let column = match actor.kind {
            ActorKind::Dealer => purchase_order::Column::DealerId,
            ActorKind::Provider => purchase_order::Column::ProviderId,
            ActorKind::Customer => {
                return Err(ServiceError::Forbidden(
                    "customers have no purchase orders".to_string(),
                ))
            }
        };
        let select = PurchaseOrderEntity::find()
            .filter(column.eq(actor.id))
            .order_by_desc(purchase_order::Column::CreatedAt)
            .order_by_desc(purchase_order::Column::Id);
        fetch_page(&self.db, select, page, limit).await
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: i32,
        request: UpdatePurchaseOrder,
    ) -> Result<PurchaseOrderModel, ServiceError> {
        request.validate()?;
        let txn = self.db.begin().await?;

        let existing = PurchaseOrderEntity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Purchase order", id))?;
        ensure_pending(&existing)?;

        let (transport_id, transport_cost) = match request.provider_transport_id {
            Some(transport_id) if transport_id != existing.provider_transport_id => {
                let transport = load_transport(&txn, transport_id, existing.provider_id).await?;
                (transport.id, transport.transport_cost)
            }
            _ => (existing.provider_transport_id, existing.transport_cost),
        };
        let quantity = request.quantity_ordered.unwrap_or(existing.quantity_ordered);
        let unit_cost = request
            .unit_cost
            .map(pricing::round_money)
            .unwrap_or(existing.unit_cost);

        let mut model = existing.into_active_model();
        model.provider_transport_id = Set(transport_id);
        model.transport_cost = Set(transport_cost);
        model.quantity_ordered = Set(quantity);
        model.unit_cost = Set(unit_cost);
        model.total_cost = Set(pricing::purchase_order_total(
            quantity,
            unit_cost,
            transport_cost,
        )?);
        let updated = model.update(&txn).await?;
        txn.commit().await?;

        info!(total_cost = %updated.total_cost, "Purchase order updated");
        Ok(updated)
    }

    /// Provider-side status and payment flag change.
    #[instrument(skip(self, existing), fields(purchase_order_id = existing.id))]
    pub async fn update_status(
        &self,
        existing: PurchaseOrderModel,
        request: UpdatePurchaseOrderStatus,
    ) -> Result<PurchaseOrderModel, ServiceError> {
        if request.status.is_none() && request.payment_status.is_none() {
            return Err(ServiceError::ValidationError(
                "status or payment_status is required".to_string(),
            ));
        }
        let mut model = existing.into_active_model();
        if let Some(status) = request.status {
            model.status = Set(status);
        }
        if let Some(paid) = request.payment_status {
            model.payment_status = Set(paid);
        }
        let updated = model.update(&*self.db).await?;
        info!(status = ?updated.status, paid = updated.payment_status, "Purchase order status updated");
        Ok(updated)
    }

    #[instrument(skip(self, existing), fields(purchase_order_id = existing.id))]
    pub async fn delete(&self, existing: PurchaseOrderModel) -> Result<(), ServiceError> {
        ensure_pending(&existing)?;
        PurchaseOrderEntity::delete_by_id(existing.id)
            .exec(&*self.db)
            .await?;
        info!("Purchase order deleted");
        Ok(())
    }
}
