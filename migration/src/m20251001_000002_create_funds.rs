use sea_orm_migration::prelude::*;

use super::m20251001_000001_create_companies::Companies;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Funds::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Funds::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Funds::CompanyId).integer().not_null())
                    // Nullable: legacy and manually entered funds have no Gemelnet id
                    .col(
                        ColumnDef::new(Funds::ExternalId)
                            .string_len(50)
                            .null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Funds::Name).string_len(500).not_null())
                    .col(
                        ColumnDef::new(Funds::Category)
                            .string_len(50)
                            .not_null()
                            .default("uncategorized"),
                    )
                    .col(
                        ColumnDef::new(Funds::FundClassification)
                            .string_len(200)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Funds::Specialization)
                            .string_len(200)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Funds::SubSpecialization)
                            .string_len(200)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Funds::InceptionDate).date().null())
                    .col(ColumnDef::new(Funds::ManagementFee).decimal_len(5, 2).null())
                    // Cached copies of the latest snapshot
                    .col(ColumnDef::new(Funds::ReturnRate).decimal_len(6, 2).null())
                    .col(ColumnDef::new(Funds::TotalAssets).decimal_len(15, 2).null())
                    .col(ColumnDef::new(Funds::LatestReportPeriod).integer().null())
                    .col(
                        ColumnDef::new(Funds::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(
                        ColumnDef::new(Funds::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_funds_company")
                            .from(Funds::Table, Funds::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_funds_company_category")
                    .table(Funds::Table)
                    .col(Funds::CompanyId)
                    .col(Funds::Category)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_funds_return_rate")
                    .table(Funds::Table)
                    .col(Funds::ReturnRate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Funds::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Funds {
    Table,
    Id,
    CompanyId,
    ExternalId,
    Name,
    Category,
    FundClassification,
    Specialization,
    SubSpecialization,
    InceptionDate,
    ManagementFee,
    ReturnRate,
    TotalAssets,
    LatestReportPeriod,
    CreatedAt,
    UpdatedAt,
}
