use sea_orm_migration::prelude::*;

use crate::m20240101_000002_create_catalog_tables::{ProviderTransports, Substances};
use crate::{Dealers, Providers};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PurchaseOrders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseOrders::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PurchaseOrders::DealerId).integer().not_null())
                    .col(
                        ColumnDef::new(PurchaseOrders::ProviderId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::SubstanceId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::ProviderTransportId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::QuantityOrdered)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::UnitCost)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::TransportCost)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::TotalCost)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::PaymentStatus)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::Status)
                            .string_len(32)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_orders_dealer")
                            .from(PurchaseOrders::Table, PurchaseOrders::DealerId)
                            .to(Dealers::Table, Dealers::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_orders_provider")
                            .from(PurchaseOrders::Table, PurchaseOrders::ProviderId)
                            .to(Providers::Table, Providers::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_orders_substance")
                            .from(PurchaseOrders::Table, PurchaseOrders::SubstanceId)
                            .to(Substances::Table, Substances::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_orders_transport")
                            .from(PurchaseOrders::Table, PurchaseOrders::ProviderTransportId)
                            .to(ProviderTransports::Table, ProviderTransports::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_purchase_orders_dealer_id")
                    .table(PurchaseOrders::Table)
                    .col(PurchaseOrders::DealerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_purchase_orders_provider_id")
                    .table(PurchaseOrders::Table)
                    .col(PurchaseOrders::ProviderId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PurchaseOrders {
    Table,
    Id,
    DealerId,
    ProviderId,
    SubstanceId,
    ProviderTransportId,
    QuantityOrdered,
    UnitCost,
    TransportCost,
    TotalCost,
    PaymentStatus,
    Status,
    CreatedAt,
    UpdatedAt,
}
