pub use sea_orm_migration::prelude::*;

mod m20251001_000001_create_companies;
mod m20251001_000002_create_funds;
mod m20251001_000003_create_fund_snapshots;
mod m20251002_000001_create_portfolios;
mod m20251002_000002_create_periodic_contributions;
mod m20251005_000001_create_sync_status;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251001_000001_create_companies::Migration),
            Box::new(m20251001_000002_create_funds::Migration),
            Box::new(m20251001_000003_create_fund_snapshots::Migration),
            Box::new(m20251002_000001_create_portfolios::Migration),
            Box::new(m20251002_000002_create_periodic_contributions::Migration),
            Box::new(m20251005_000001_create_sync_status::Migration),
        ]
    }
}
