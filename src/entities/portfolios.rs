//! `SeaORM` Entity for user portfolios (read-only for this service)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "portfolios")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub owner_name: String,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::portfolio_holdings::Entity")]
    PortfolioHoldings,
}

impl Related<super::portfolio_holdings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PortfolioHoldings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
