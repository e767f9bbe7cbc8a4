use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, DatabaseTransaction, EntityTrait, IntoActiveModel, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use super::orders::{ensure_pending, ensure_substance, recompute_order_total};
use super::{pricing, pricing::validate_amount};
use crate::db::{insert_with_retry, CreateRetryConfig, DbPool};
use crate::entities::{
    order::{Entity as OrderEntity, Model as OrderModel},
    order_item::{self, Entity as OrderItemEntity, Model as OrderItemModel},
};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewOrderItem {
    pub order_id: i32,
    pub substance_id: i32,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(custom = "validate_amount")]
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderItem {
    #[validate(range(min = 1))]
    pub quantity: Option<i32>,
    #[validate(custom = "validate_amount")]
    pub unit_price: Option<Decimal>,
}

/// Result of an item write: the item (absent after a delete) and the parent
/// order's recomputed total.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ItemChange {
    pub item: Option<OrderItemModel>,
    pub order_total: Decimal,
}

/// Line item writes. Each write and the parent total recompute share one
/// transaction, and all of them require a pending parent order.
#[derive(Clone)]
pub struct OrderItemService {
    db: Arc<DbPool>,
    retry: CreateRetryConfig,
}

impl OrderItemService {
    pub fn new(db: Arc<DbPool>, retry: CreateRetryConfig) -> Self {
        Self { db, retry }
    }

    pub async fn get(&self, id: i32) -> Result<Option<OrderItemModel>, ServiceError> {
        Ok(OrderItemEntity::find_by_id(id).one(&*self.db).await?)
    }

    #[instrument(skip(self, request), fields(order_id = request.order_id))]
    pub async fn create(&self, request: NewOrderItem) -> Result<ItemChange, ServiceError> {
        request.validate()?;
        let txn = self.db.begin().await?;

        load_pending_order(&txn, request.order_id).await?;
        ensure_substance(&txn, request.substance_id).await?;

        let unit_price = pricing::round_money(request.unit_price);
        let item = insert_with_retry(
            &txn,
            order_item::ActiveModel {
                order_id: Set(request.order_id),
                substance_id: Set(request.substance_id),
                quantity: Set(request.quantity),
                unit_price: Set(unit_price),
                sub_total: Set(pricing::line_subtotal(request.quantity, unit_price)?),
                ..Default::default()
            },
            self.retry,
        )
        .await?;

        let order_total = recompute_order_total(&txn, request.order_id).await?;
        txn.commit().await?;

        info!(item_id = item.id, %order_total, "Order item created");
        Ok(ItemChange {
            item: Some(item),
            order_total,
        })
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: i32,
        request: UpdateOrderItem,
    ) -> Result<ItemChange, ServiceError> {
        request.validate()?;
        let txn = self.db.begin().await?;

        let existing = load_item(&txn, id).await?;
        load_pending_order(&txn, existing.order_id).await?;

        let quantity = request.quantity.unwrap_or(existing.quantity);
        let unit_price = request
            .unit_price
            .map(pricing::round_money)
            .unwrap_or(existing.unit_price);
        let order_id = existing.order_id;

        let mut model = existing.into_active_model();
        model.quantity = Set(quantity);
        model.unit_price = Set(unit_price);
        model.sub_total = Set(pricing::line_subtotal(quantity, unit_price)?);
        let item = model.update(&txn).await?;

        let order_total = recompute_order_total(&txn, order_id).await?;
        txn.commit().await?;

        info!(item_id = id, %order_total, "Order item updated");
        Ok(ItemChange {
            item: Some(item),
            order_total,
        })
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<ItemChange, ServiceError> {
        let txn = self.db.begin().await?;

        let existing = load_item(&txn, id).await?;
        load_pending_order(&txn, existing.order_id).await?;

        OrderItemEntity::delete_by_id(id).exec(&txn).await?;
        let order_total = recompute_order_total(&txn, existing.order_id).await?;
        txn.commit().await?;

        info!(item_id = id, %order_total, "Order item deleted");
        Ok(ItemChange {
            item: None,
            order_total,
        })
    }
}

async fn load_item(txn: &DatabaseTransaction, id: i32) -> Result<OrderItemModel, ServiceError> {
    OrderItemEntity::find_by_id(id)
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Order item", id))
}

async fn load_pending_order(
    txn: &DatabaseTransaction,
    order_id: i32,
) -> Result<OrderModel, ServiceError> {
    let order = OrderEntity::find_by_id(order_id)
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Order", order_id))?;
    ensure_pending(&order)?;
    Ok(order)
}
