use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::order::OrderStatus;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    #[sea_orm(string_value = "preparing")]
    Preparing,
    #[sea_orm(string_value = "in_transit")]
    InTransit,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl ShipmentStatus {
    /// Order status a shipment in this state implies.
    pub fn order_status(self) -> OrderStatus {
        match self {
            ShipmentStatus::Preparing => OrderStatus::Processing,
            ShipmentStatus::InTransit => OrderStatus::Shipped,
            ShipmentStatus::Delivered => OrderStatus::Delivered,
            ShipmentStatus::Failed => OrderStatus::Cancelled,
        }
    }
}

/// A shipment without a status counts as preparing.
pub fn order_status_for(status: Option<ShipmentStatus>) -> OrderStatus {
    status.unwrap_or(ShipmentStatus::Preparing).order_status()
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "shipments")]
#[schema(as = Shipment)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub order_id: i32,
    pub carrier: String,
    pub tracking_number: Option<String>,
    pub status: ShipmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();
        if insert && self.created_at.is_not_set() {
            self.created_at = Set(now);
        }
        self.updated_at = Set(now);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipment_status_maps_onto_order_status() {
        assert_eq!(order_status_for(None), OrderStatus::Processing);
        assert_eq!(
            order_status_for(Some(ShipmentStatus::Preparing)),
            OrderStatus::Processing
        );
        assert_eq!(ShipmentStatus::InTransit.order_status(), OrderStatus::Shipped);
        assert_eq!(ShipmentStatus::Delivered.order_status(), OrderStatus::Delivered);
        assert_eq!(ShipmentStatus::Failed.order_status(), OrderStatus::Cancelled);
    }
}
