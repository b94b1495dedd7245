#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use gemelnet_backend::entities::{
    companies, fund_snapshots, funds, periodic_contributions, portfolio_holdings, portfolios,
    prelude::*,
};
use gemelnet_backend::services::fund_sync::{FundSyncService, SyncOptions};
use gemelnet_backend::services::gemelnet::{
    DatasetClient, DatasetPage, FetchError, GemelnetConfig, RawRecord,
};
use gemelnet_backend::AppState;
use migration::{Migrator, MigratorTrait};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, Database, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::json;

pub const ADMIN_TOKEN: &str = "test-admin-token";

/// Fresh in-memory SQLite database with all migrations applied.
///
/// A single pooled connection keeps every query on the same in-memory
/// database.
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Dataset served from memory, paginated like the real API.
///
/// Resources registered with `set_resource` serve their own rows; any other
/// resource id serves the default records.
pub struct StaticDataset {
    records: Mutex<Vec<RawRecord>>,
    resources: Mutex<HashMap<String, Vec<RawRecord>>>,
    fail: Mutex<bool>,
    failing_resource: Mutex<Option<String>>,
    pub calls: Mutex<usize>,
}

impl StaticDataset {
    pub fn new(records: Vec<RawRecord>) -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(records),
            resources: Mutex::new(HashMap::new()),
            fail: Mutex::new(false),
            failing_resource: Mutex::new(None),
            calls: Mutex::new(0),
        })
    }

    pub fn set_records(&self, records: Vec<RawRecord>) {
        *self.records.lock().unwrap() = records;
    }

    pub fn set_resource(&self, resource_id: &str, records: Vec<RawRecord>) {
        self.resources
            .lock()
            .unwrap()
            .insert(resource_id.to_string(), records);
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn fail_resource(&self, resource_id: &str) {
        *self.failing_resource.lock().unwrap() = Some(resource_id.to_string());
    }
}

#[async_trait]
impl DatasetClient for StaticDataset {
    async fn fetch_page(
        &self,
        resource_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<DatasetPage, FetchError> {
        *self.calls.lock().unwrap() += 1;

        let failing_resource = self.failing_resource.lock().unwrap().as_deref() == Some(resource_id);
        if *self.fail.lock().unwrap() || failing_resource {
            return Err(FetchError::Status {
                status: 503,
                body: "Service Unavailable".to_string(),
            });
        }

        let resources = self.resources.lock().unwrap();
        let default_records = self.records.lock().unwrap();
        let records = resources.get(resource_id).unwrap_or(&*default_records);
        let page = records.iter().skip(offset).take(limit).cloned().collect();
        Ok(DatasetPage {
            records: page,
            total: records.len(),
        })
    }
}

/// A complete Gemelnet row. Numeric metrics use values that survive a
/// round trip through SQLite exactly.
pub fn record(fund_id: &str, period: i32, return_5yr: &str, total_assets: &str) -> RawRecord {
    json!({
        "_id": 1,
        "FUND_ID": fund_id.parse::<i64>().map(|n| json!(n)).unwrap_or(json!(fund_id)),
        "FUND_NAME": format!("קרן {}", fund_id),
        "REPORT_PERIOD": period,
        "MANAGING_CORPORATION": "הראל פיננסים",
        "MANAGING_CORPORATION_LEGAL_ID": "513910703",
        "FUND_CLASSIFICATION": "תגמולים ואישית לפיצויים",
        "SPECIALIZATION": "מניות",
        "SUB_SPECIALIZATION": "",
        "INCEPTION_DATE": "2010-01-01 00:00:00",
        "AVG_ANNUAL_MANAGEMENT_FEE": "0.5",
        "AVG_DEPOSIT_FEE": "0.25",
        "MONTHLY_YIELD": "1.25",
        "YEAR_TO_DATE_YIELD": "4.5",
        "YIELD_TRAILING_3_YRS": "20.5",
        "YIELD_TRAILING_5_YRS": "45.25",
        "AVG_ANNUAL_YIELD_TRAILING_3YRS": "6.5",
        "AVG_ANNUAL_YIELD_TRAILING_5YRS": return_5yr,
        "TOTAL_ASSETS": total_assets,
        "DEPOSITS": "10.5",
        "WITHDRAWLS": "2.25",
        "INTERNAL_TRANSFERS": "-0.5",
        "NET_MONTHLY_DEPOSITS": "8.25",
        "STANDARD_DEVIATION": "3.5",
        "ALPHA": "0.75",
        "SHARPE_RATIO": "1.5",
        "LIQUID_ASSETS_PERCENT": "95.5",
        "STOCK_MARKET_EXPOSURE": "60.25",
        "FOREIGN_EXPOSURE": "30.5",
        "FOREIGN_CURRENCY_EXPOSURE": "20.75"
    })
    .as_object()
    .cloned()
    .unwrap()
}

pub fn with_company(mut record: RawRecord, legal_id: &str, name: &str) -> RawRecord {
    record.insert("MANAGING_CORPORATION_LEGAL_ID".to_string(), json!(legal_id));
    record.insert("MANAGING_CORPORATION".to_string(), json!(name));
    record
}

pub fn without(mut record: RawRecord, key: &str) -> RawRecord {
    record.remove(key);
    record
}

pub fn test_options() -> SyncOptions {
    SyncOptions::new(&GemelnetConfig::default())
}

pub fn sync_service(
    db: &DatabaseConnection,
    dataset: Arc<StaticDataset>,
    options: SyncOptions,
) -> FundSyncService {
    FundSyncService::new(db.clone(), dataset, options)
}

pub fn test_app_state(db: DatabaseConnection, dataset: Arc<StaticDataset>) -> AppState {
    AppState::new(
        db,
        dataset,
        GemelnetConfig::default(),
        Some(ADMIN_TOKEN.to_string()),
    )
}

pub async fn fund_by_external_id(db: &DatabaseConnection, external_id: &str) -> funds::Model {
    Funds::find()
        .filter(funds::Column::ExternalId.eq(external_id))
        .one(db)
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("fund {} not stored", external_id))
}

pub async fn snapshot_periods(db: &DatabaseConnection, fund_id: i32) -> Vec<i32> {
    FundSnapshots::find()
        .filter(fund_snapshots::Column::FundId.eq(fund_id))
        .order_by_asc(fund_snapshots::Column::ReportPeriod)
        .all(db)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.report_period)
        .collect()
}

pub async fn count_rows(db: &DatabaseConnection) -> (usize, usize, usize) {
    (
        Companies::find().all(db).await.unwrap().len(),
        Funds::find().all(db).await.unwrap().len(),
        FundSnapshots::find().all(db).await.unwrap().len(),
    )
}

pub async fn company_by_legal_id(db: &DatabaseConnection, legal_id: &str) -> companies::Model {
    Companies::find()
        .filter(companies::Column::LegalId.eq(legal_id))
        .one(db)
        .await
        .unwrap()
        .unwrap()
}

/// A portfolio with one holding per `(fund_id, amount, purchase_date)`.
pub async fn create_portfolio(
    db: &DatabaseConnection,
    holdings: &[(i32, Decimal, Option<NaiveDate>)],
) -> (portfolios::Model, Vec<portfolio_holdings::Model>) {
    let now = Utc::now().naive_utc();
    let portfolio = portfolios::ActiveModel {
        name: Set("Retirement".to_string()),
        owner_name: Set("Test Owner".to_string()),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();

    let mut stored = Vec::new();
    for (fund_id, amount, purchase_date) in holdings {
        let holding = portfolio_holdings::ActiveModel {
            portfolio_id: Set(portfolio.id),
            fund_id: Set(*fund_id),
            amount: Set(*amount),
            purchase_date: Set(*purchase_date),
            added_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
        stored.push(holding);
    }

    (portfolio, stored)
}

pub async fn add_contribution(
    db: &DatabaseConnection,
    holding_id: i32,
    amount: Decimal,
    interval: &str,
    start_date: NaiveDate,
) -> periodic_contributions::Model {
    periodic_contributions::ActiveModel {
        holding_id: Set(holding_id),
        amount: Set(amount),
        interval: Set(interval.to_string()),
        start_date: Set(start_date),
        end_date: Set(None),
        is_active: Set(true),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}
