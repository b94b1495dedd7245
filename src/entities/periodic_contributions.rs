//! `SeaORM` Entity for planned periodic contributions to a holding
//!
//! Used for projections only, never for real transactions.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "periodic_contributions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub holding_id: i32,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub amount: Decimal,
    /// DAILY, WEEKLY, MONTHLY, QUARTERLY or YEARLY
    pub interval: String,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub is_active: bool,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::portfolio_holdings::Entity",
        from = "Column::HoldingId",
        to = "super::portfolio_holdings::Column::Id",
        on_delete = "Cascade"
    )]
    PortfolioHoldings,
}

impl Related<super::portfolio_holdings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PortfolioHoldings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
