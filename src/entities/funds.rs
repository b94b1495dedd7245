//! `SeaORM` Entity for mutual funds
//!
//! `return_rate`, `total_assets` and `latest_report_period` are cached copies
//! of the fund's maximum-period snapshot.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "funds")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub company_id: i32,
    /// Gemelnet FUND_ID; None for legacy or manually entered funds
    #[sea_orm(unique)]
    pub external_id: Option<String>,
    pub name: String,
    /// Slug of `FundCategory`
    pub category: String,
    pub fund_classification: String,
    pub specialization: String,
    pub sub_specialization: String,
    pub inception_date: Option<Date>,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))", nullable)]
    pub management_fee: Option<Decimal>,
    /// Average annual return (5y, falling back to 3y) of the latest snapshot
    #[sea_orm(column_type = "Decimal(Some((6, 2)))", nullable)]
    pub return_rate: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))", nullable)]
    pub total_assets: Option<Decimal>,
    /// YYYYMM
    pub latest_report_period: Option<i32>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::companies::Entity",
        from = "Column::CompanyId",
        to = "super::companies::Column::Id",
        on_delete = "Cascade"
    )]
    Companies,
    #[sea_orm(has_many = "super::fund_snapshots::Entity")]
    FundSnapshots,
    #[sea_orm(has_many = "super::portfolio_holdings::Entity")]
    PortfolioHoldings,
}

impl Related<super::companies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Companies.def()
    }
}

impl Related<super::fund_snapshots::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FundSnapshots.def()
    }
}

impl Related<super::portfolio_holdings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PortfolioHoldings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
