use sea_orm_migration::prelude::*;

use super::m20251001_000002_create_funds::Funds;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Every metric column is nullable: the source dataset is sparse per period.
fn metric(col: FundSnapshots) -> ColumnDef {
    ColumnDef::new(col).decimal_len(16, 4).null().to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FundSnapshots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FundSnapshots::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FundSnapshots::FundId).integer().not_null())
                    .col(ColumnDef::new(FundSnapshots::ReportPeriod).integer().not_null())
                    // Performance
                    .col(metric(FundSnapshots::MonthlyYield))
                    .col(metric(FundSnapshots::YtdYield))
                    .col(metric(FundSnapshots::Return3yr))
                    .col(metric(FundSnapshots::Return5yr))
                    .col(metric(FundSnapshots::AvgAnnualReturn3yr))
                    .col(metric(FundSnapshots::AvgAnnualReturn5yr))
                    // Assets and flows (millions ILS)
                    .col(metric(FundSnapshots::TotalAssets))
                    .col(metric(FundSnapshots::Deposits))
                    .col(metric(FundSnapshots::Withdrawals))
                    .col(metric(FundSnapshots::NetDeposits))
                    .col(metric(FundSnapshots::InternalTransfers))
                    .col(metric(FundSnapshots::NetMonthlyDeposits))
                    // Risk
                    .col(metric(FundSnapshots::StandardDeviation))
                    .col(metric(FundSnapshots::Alpha))
                    .col(metric(FundSnapshots::SharpeRatio))
                    // Exposure
                    .col(metric(FundSnapshots::LiquidAssetsPercent))
                    .col(metric(FundSnapshots::StockMarketExposure))
                    .col(metric(FundSnapshots::ForeignExposure))
                    .col(metric(FundSnapshots::ForeignCurrencyExposure))
                    // Fees
                    .col(metric(FundSnapshots::AvgAnnualManagementFee))
                    .col(metric(FundSnapshots::AvgDepositFee))
                    .col(
                        ColumnDef::new(FundSnapshots::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_fund_snapshots_fund")
                            .from(FundSnapshots::Table, FundSnapshots::FundId)
                            .to(Funds::Table, Funds::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique constraint: one snapshot per fund per period
        manager
            .create_index(
                Index::create()
                    .name("idx_fund_snapshots_fund_period_unique")
                    .table(FundSnapshots::Table)
                    .col(FundSnapshots::FundId)
                    .col(FundSnapshots::ReportPeriod)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Period distribution queries
        manager
            .create_index(
                Index::create()
                    .name("idx_fund_snapshots_period")
                    .table(FundSnapshots::Table)
                    .col(FundSnapshots::ReportPeriod)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FundSnapshots::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden, Clone, Copy)]
enum FundSnapshots {
    Table,
    Id,
    FundId,
    ReportPeriod,
    MonthlyYield,
    YtdYield,
    #[sea_orm(iden = "return_3yr")]
    Return3yr,
    #[sea_orm(iden = "return_5yr")]
    Return5yr,
    #[sea_orm(iden = "avg_annual_return_3yr")]
    AvgAnnualReturn3yr,
    #[sea_orm(iden = "avg_annual_return_5yr")]
    AvgAnnualReturn5yr,
    TotalAssets,
    Deposits,
    Withdrawals,
    NetDeposits,
    InternalTransfers,
    NetMonthlyDeposits,
    StandardDeviation,
    Alpha,
    SharpeRatio,
    LiquidAssetsPercent,
    StockMarketExposure,
    ForeignExposure,
    ForeignCurrencyExposure,
    AvgAnnualManagementFee,
    AvgDepositFee,
    CreatedAt,
}
