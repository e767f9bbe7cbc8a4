use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use super::{fetch_page, pricing, pricing::validate_amount, Page};
use crate::auth::{Actor, ActorKind};
use crate::db::{insert_with_retry, CreateRetryConfig, DbPool};
use crate::entities::{
    dealer,
    order::{self, Entity as OrderEntity, Model as OrderModel, OrderStatus, PaymentStatus},
    order_item::{self, Entity as OrderItemEntity, Model as OrderItemModel},
    shipment, substance,
};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewOrderLine {
    pub substance_id: i32,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(custom = "validate_amount")]
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewOrder {
    pub dealer_id: i32,
    #[validate(length(min = 1, max = 500))]
    pub delivery_address: String,
    #[validate(length(min = 1, max = 64))]
    pub payment_method: String,
    #[validate(length(min = 1, message = "an order needs at least one item"))]
    pub items: Vec<NewOrderLine>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateOrder {
    #[validate(length(min = 1, max = 500))]
    pub delivery_address: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateOrderStatus {
    pub order_status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

/// An order together with its line items.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderDetail {
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
}

/// Item mutations are only allowed while the parent order is pending.
pub(crate) fn ensure_pending(order: &OrderModel) -> Result<(), ServiceError> {
    if order.is_pending() {
        Ok(())
    } else {
        Err(ServiceError::InvalidOperation(format!(
            "order {} is {}; only pending orders can be changed",
            order.id, order.order_status
        )))
    }
}

pub(crate) async fn ensure_substance<C: ConnectionTrait>(
    conn: &C,
    substance_id: i32,
) -> Result<substance::Model, ServiceError> {
    substance::Entity::find_by_id(substance_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::InvalidInput(format!("substance {} does not exist", substance_id))
        })
}

/// Sets `orders.total_amount` to the rounded sum of the order's item
/// subtotals, zero when no items remain. Run it on the same connection or
/// transaction that changed the items.
pub async fn recompute_order_total<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
) -> Result<Decimal, ServiceError> {
    let items = OrderItemEntity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .all(conn)
        .await?;
    let total = pricing::order_total(items.iter().map(|item| item.sub_total))?;

    OrderEntity::update_many()
        .col_expr(order::Column::TotalAmount, Expr::value(total))
        .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(order::Column::Id.eq(order_id))
        .exec(conn)
        .await
        .map_err(|e| {
            error!(error = %e, order_id, "Failed to write order total");
            ServiceError::DatabaseError(e)
        })?;

    Ok(total)
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    retry: CreateRetryConfig,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>, retry: CreateRetryConfig) -> Self {
        Self { db, retry }
    }

    /// Creates the order, its items and its total in one transaction.
    #[instrument(skip(self, request), fields(dealer_id = request.dealer_id, lines = request.items.len()))]
    pub async fn create(
        &self,
        customer_id: i32,
        request: NewOrder,
    ) -> Result<OrderDetail, ServiceError> {
        request.validate()?;
        for line in &request.items {
            line.validate()?;
        }

        let txn = self.db.begin().await?;

        if dealer::Entity::find_by_id(request.dealer_id)
            .one(&txn)
            .await?
            .is_none()
        {
            return Err(ServiceError::InvalidInput(format!(
                "dealer {} does not exist",
                request.dealer_id
            )));
        }

        let order = insert_with_retry(
            &txn,
            order::ActiveModel {
                customer_id: Set(customer_id),
                dealer_id: Set(request.dealer_id),
                total_amount: Set(Decimal::ZERO),
                order_status: Set(OrderStatus::Pending),
                delivery_address: Set(request.delivery_address),
                payment_method: Set(request.payment_method),
                payment_status: Set(PaymentStatus::Pending),
                ..Default::default()
            },
            self.retry,
        )
        .await?;

        for line in request.items {
            ensure_substance(&txn, line.substance_id).await?;
            let unit_price = pricing::round_money(line.unit_price);
            insert_with_retry(
                &txn,
                order_item::ActiveModel {
                    order_id: Set(order.id),
                    substance_id: Set(line.substance_id),
                    quantity: Set(line.quantity),
                    unit_price: Set(unit_price),
                    sub_total: Set(pricing::line_subtotal(line.quantity, unit_price)?),
                    ..Default::default()
                },
                self.retry,
            )
            .await?;
        }

        let total = recompute_order_total(&txn, order.id).await?;
        txn.commit().await?;

        info!(order_id = order.id, customer_id, %total, "Order created");
        self.detail(order.id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order", order.id))
    }

    pub async fn get(&self, id: i32) -> Result<Option<OrderModel>, ServiceError> {
        Ok(OrderEntity::find_by_id(id).one(&*self.db).await?)
    }

    pub async fn items(&self, order_id: i32) -> Result<Vec<OrderItemModel>, ServiceError> {
        Ok(OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::Id)
            .all(&*self.db)
            .await?)
    }

    pub async fn detail(&self, id: i32) -> Result<Option<OrderDetail>, ServiceError> {
        let Some(order) = self.get(id).await? else {
            return Ok(None);
        };
        let items = self.items(id).await?;
        Ok(Some(OrderDetail { order, items }))
    }

    /// Customers see the orders they placed, dealers the orders placed with them.
    #[instrument(skip(self, actor), fields(actor_id = actor.id, kind = %actor.kind))]
    pub async fn list_for(
        &self,
        actor: &Actor,
        page: u64,
        limit: u64,
    ) -> Result<Page<OrderModel>, ServiceError> {
        let column = match actor.kind {
            ActorKind::Customer => order::Column::CustomerId,
            ActorKind::Dealer => order::Column::DealerId,
            ActorKind::Provider => {
                return Err(ServiceError::Forbidden(
                    "providers have no orders".to_string(),
                ))
            }
        };
        let select = OrderEntity::find()
            .filter(column.eq(actor.id))
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id);
        fetch_page(&self.db, select, page, limit).await
    }

    #[instrument(skip(self, existing, request), fields(order_id = existing.id))]
    pub async fn update(
        &self,
        existing: OrderModel,
        request: UpdateOrder,
    ) -> Result<OrderModel, ServiceError> {
        request.validate()?;
        ensure_pending(&existing)?;
        let mut model = existing.into_active_model();
        if let Some(address) = request.delivery_address {
            model.delivery_address = Set(address);
        }
        if let Some(method) = request.payment_method {
            model.payment_method = Set(method);
        }
        let updated = model.update(&*self.db).await?;
        info!("Order updated");
        Ok(updated)
    }

    /// Dealer-side status change. No transition rules are enforced.
    #[instrument(skip(self, existing), fields(order_id = existing.id))]
    pub async fn update_status(
        &self,
        existing: OrderModel,
        request: UpdateOrderStatus,
    ) -> Result<OrderModel, ServiceError> {
        if request.order_status.is_none() && request.payment_status.is_none() {
            return Err(ServiceError::ValidationError(
                "order_status or payment_status is required".to_string(),
            ));
        }
        let mut model = existing.into_active_model();
        if let Some(status) = request.order_status {
            model.order_status = Set(status);
        }
        if let Some(status) = request.payment_status {
            model.payment_status = Set(status);
        }
        let updated = model.update(&*self.db).await?;
        info!(
            order_status = %updated.order_status,
            payment_status = ?updated.payment_status,
            "Order status updated"
        );
        Ok(updated)
    }

    /// Removes a pending order with its items and any shipment record.
    #[instrument(skip(self, existing), fields(order_id = existing.id))]
    pub async fn delete(&self, existing: OrderModel) -> Result<(), ServiceError> {
        ensure_pending(&existing)?;
        let txn = self.db.begin().await?;
        shipment::Entity::delete_many()
            .filter(shipment::Column::OrderId.eq(existing.id))
            .exec(&txn)
            .await?;
        OrderItemEntity::delete_many()
            .filter(order_item::Column::OrderId.eq(existing.id))
            .exec(&txn)
            .await?;
        OrderEntity::delete_by_id(existing.id).exec(&txn).await?;
        txn.commit().await?;
        info!("Order deleted");
        Ok(())
    }
}
