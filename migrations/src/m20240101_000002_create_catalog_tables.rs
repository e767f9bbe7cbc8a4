use sea_orm_migration::prelude::*;

use crate::{Dealers, Providers};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // substances
        manager
            .create_table(
                Table::create()
                    .table(Substances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Substances::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Substances::ProviderId).integer().not_null())
                    .col(ColumnDef::new(Substances::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Substances::Description).text().null())
                    .col(ColumnDef::new(Substances::Category).string_len(100).null())
                    .col(
                        ColumnDef::new(Substances::UnitPrice)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Substances::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Substances::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_substances_provider")
                            .from(Substances::Table, Substances::ProviderId)
                            .to(Providers::Table, Providers::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_substances_provider_id")
                    .table(Substances::Table)
                    .col(Substances::ProviderId)
                    .to_owned(),
            )
            .await?;

        // provider_transports
        manager
            .create_table(
                Table::create()
                    .table(ProviderTransports::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProviderTransports::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProviderTransports::ProviderId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProviderTransports::TransportMode)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProviderTransports::TransportCost)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProviderTransports::EstimatedDays)
                            .integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ProviderTransports::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProviderTransports::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_provider_transports_provider")
                            .from(ProviderTransports::Table, ProviderTransports::ProviderId)
                            .to(Providers::Table, Providers::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // inventory
        manager
            .create_table(
                Table::create()
                    .table(Inventory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Inventory::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Inventory::DealerId).integer().not_null())
                    .col(ColumnDef::new(Inventory::SubstanceId).integer().not_null())
                    .col(
                        ColumnDef::new(Inventory::QuantityAvailable)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Inventory::UnitPrice)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Inventory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Inventory::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_dealer")
                            .from(Inventory::Table, Inventory::DealerId)
                            .to(Dealers::Table, Dealers::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_substance")
                            .from(Inventory::Table, Inventory::SubstanceId)
                            .to(Substances::Table, Substances::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("inventory_dealer_id_substance_id_key")
                    .table(Inventory::Table)
                    .col(Inventory::DealerId)
                    .col(Inventory::SubstanceId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Inventory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProviderTransports::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Substances::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Substances {
    Table,
    Id,
    ProviderId,
    Name,
    Description,
    Category,
    UnitPrice,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum ProviderTransports {
    Table,
    Id,
    ProviderId,
    TransportMode,
    TransportCost,
    EstimatedDays,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Inventory {
    Table,
    Id,
    DealerId,
    SubstanceId,
    QuantityAvailable,
    UnitPrice,
    CreatedAt,
    UpdatedAt,
}
