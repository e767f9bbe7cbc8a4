use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const ACCOUNT_TABLES: [&str; 3] = ["customers", "dealers", "providers"];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // customers, dealers and providers share one shape; username and email
        // carry the `{table}_{column}_key` unique constraints.
        for table in ACCOUNT_TABLES {
            manager
                .create_table(account_table(Alias::new(table)))
                .await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in ACCOUNT_TABLES.iter().rev() {
            manager
                .drop_table(Table::drop().table(Alias::new(*table)).to_owned())
                .await?;
        }
        Ok(())
    }
}

fn account_table(table: Alias) -> TableCreateStatement {
    Table::create()
        .table(table)
        .if_not_exists()
        .col(
            ColumnDef::new(Account::Id)
                .integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(
            ColumnDef::new(Account::Username)
                .string_len(64)
                .not_null()
                .unique_key(),
        )
        .col(
            ColumnDef::new(Account::Email)
                .string_len(255)
                .not_null()
                .unique_key(),
        )
        .col(ColumnDef::new(Account::PasswordHash).text().not_null())
        .col(ColumnDef::new(Account::FullName).string_len(255).null())
        .col(ColumnDef::new(Account::Phone).string_len(32).null())
        .col(ColumnDef::new(Account::Address).text().null())
        .col(ColumnDef::new(Account::Organization).string_len(255).null())
        .col(
            ColumnDef::new(Account::CreatedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(
            ColumnDef::new(Account::UpdatedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .to_owned()
}

#[derive(DeriveIden)]
enum Account {
    Id,
    Username,
    Email,
    PasswordHash,
    FullName,
    Phone,
    Address,
    Organization,
    CreatedAt,
    UpdatedAt,
}
