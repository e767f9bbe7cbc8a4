pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_account_tables;
mod m20240101_000002_create_catalog_tables;
mod m20240101_000003_create_order_tables;
mod m20240101_000004_create_purchase_orders_table;
mod m20240101_000005_create_shipments_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_account_tables::Migration),
            Box::new(m20240101_000002_create_catalog_tables::Migration),
            Box::new(m20240101_000003_create_order_tables::Migration),
            Box::new(m20240101_000004_create_purchase_orders_table::Migration),
            Box::new(m20240101_000005_create_shipments_table::Migration),
        ]
    }
}

/// Identifiers shared by later migrations that reference the account tables.
#[derive(DeriveIden)]
pub(crate) enum Customers {
    Table,
    Id,
}

#[derive(DeriveIden)]
pub(crate) enum Dealers {
    Table,
    Id,
}

#[derive(DeriveIden)]
pub(crate) enum Providers {
    Table,
    Id,
}
