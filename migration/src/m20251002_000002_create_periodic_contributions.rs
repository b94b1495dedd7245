use sea_orm_migration::prelude::*;

use super::m20251002_000001_create_portfolios::PortfolioHoldings;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PeriodicContributions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PeriodicContributions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PeriodicContributions::HoldingId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PeriodicContributions::Amount)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    // DAILY, WEEKLY, MONTHLY, QUARTERLY, YEARLY
                    .col(
                        ColumnDef::new(PeriodicContributions::Interval)
                            .string_len(20)
                            .not_null()
                            .default("MONTHLY"),
                    )
                    .col(ColumnDef::new(PeriodicContributions::StartDate).date().not_null())
                    .col(ColumnDef::new(PeriodicContributions::EndDate).date().null())
                    .col(
                        ColumnDef::new(PeriodicContributions::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(PeriodicContributions::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_periodic_contributions_holding")
                            .from(PeriodicContributions::Table, PeriodicContributions::HoldingId)
                            .to(PortfolioHoldings::Table, PortfolioHoldings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_periodic_contributions_holding_active")
                    .table(PeriodicContributions::Table)
                    .col(PeriodicContributions::HoldingId)
                    .col(PeriodicContributions::IsActive)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PeriodicContributions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PeriodicContributions {
    Table,
    Id,
    HoldingId,
    Amount,
    Interval,
    StartDate,
    EndDate,
    IsActive,
    CreatedAt,
}
