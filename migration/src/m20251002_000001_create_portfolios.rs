use sea_orm_migration::prelude::*;

use super::m20251001_000002_create_funds::Funds;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Portfolios::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Portfolios::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Portfolios::Name).string_len(200).not_null())
                    .col(
                        ColumnDef::new(Portfolios::OwnerName)
                            .string_len(200)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Portfolios::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PortfolioHoldings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PortfolioHoldings::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PortfolioHoldings::PortfolioId).integer().not_null())
                    .col(ColumnDef::new(PortfolioHoldings::FundId).integer().not_null())
                    .col(
                        ColumnDef::new(PortfolioHoldings::Amount)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PortfolioHoldings::PurchaseDate).date().null())
                    .col(
                        ColumnDef::new(PortfolioHoldings::AddedAt)
                            .timestamp()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_portfolio_holdings_portfolio")
                            .from(PortfolioHoldings::Table, PortfolioHoldings::PortfolioId)
                            .to(Portfolios::Table, Portfolios::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_portfolio_holdings_fund")
                            .from(PortfolioHoldings::Table, PortfolioHoldings::FundId)
                            .to(Funds::Table, Funds::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // A fund appears at most once per portfolio
        manager
            .create_index(
                Index::create()
                    .name("idx_portfolio_holdings_portfolio_fund_unique")
                    .table(PortfolioHoldings::Table)
                    .col(PortfolioHoldings::PortfolioId)
                    .col(PortfolioHoldings::FundId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PortfolioHoldings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Portfolios::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Portfolios {
    Table,
    Id,
    Name,
    OwnerName,
    CreatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum PortfolioHoldings {
    Table,
    Id,
    PortfolioId,
    FundId,
    Amount,
    PurchaseDate,
    AddedAt,
}
