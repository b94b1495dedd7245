//! `SeaORM` Entity prelude

pub use super::companies::Entity as Companies;
pub use super::fund_snapshots::Entity as FundSnapshots;
pub use super::funds::Entity as Funds;
pub use super::periodic_contributions::Entity as PeriodicContributions;
pub use super::portfolio_holdings::Entity as PortfolioHoldings;
pub use super::portfolios::Entity as Portfolios;
pub use super::sync_status::Entity as SyncStatus;
