use sea_orm_migration::prelude::*;

use crate::m20240101_000003_create_order_tables::Orders;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One shipment per order, enforced by `shipments_order_id_key`.
        manager
            .create_table(
                Table::create()
                    .table(Shipments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Shipments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Shipments::OrderId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Shipments::Carrier).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Shipments::TrackingNumber)
                            .string_len(100)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Shipments::Status)
                            .string_len(32)
                            .not_null()
                            .default("preparing"),
                    )
                    .col(
                        ColumnDef::new(Shipments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Shipments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_shipments_order")
                            .from(Shipments::Table, Shipments::OrderId)
                            .to(Orders::Table, Orders::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Shipments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Shipments {
    Table,
    Id,
    OrderId,
    Carrier,
    TrackingNumber,
    Status,
    CreatedAt,
    UpdatedAt,
}
