use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::{companies, fund_snapshots, funds};
use crate::services::report_period::{PeriodTab, ReportPeriod};

/// Query parameters for GET /api/funds
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FundListQuery {
    /// Category slug, e.g. `stocks`
    pub category: Option<String>,
    pub company_id: Option<i32>,
    /// Fund or company name fragment
    pub search: Option<String>,
    /// 1-based (default: 1)
    pub page: Option<u64>,
}

impl FundListQuery {
    pub fn page(&self) -> Result<u64, String> {
        match self.page {
            None => Ok(1),
            Some(0) => Err("page must be at least 1".to_string()),
            Some(p) => Ok(p),
        }
    }
}

/// Query parameters for GET /api/funds/{id}/snapshots
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotRangeQuery {
    /// First period, YYYYMM (inclusive)
    pub start: Option<i32>,
    /// Last period, YYYYMM (inclusive)
    pub end: Option<i32>,
}

impl SnapshotRangeQuery {
    pub fn validate(&self) -> Result<(Option<ReportPeriod>, Option<ReportPeriod>), String> {
        let parse = |name: &str, value: Option<i32>| match value {
            None => Ok(None),
            Some(v) => ReportPeriod::new(v)
                .map(Some)
                .ok_or_else(|| format!("{} must be a YYYYMM period, got {}", name, v)),
        };

        let start = parse("start", self.start)?;
        let end = parse("end", self.end)?;

        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err("start must not be after end".to_string());
            }
        }

        Ok((start, end))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundSummary {
    pub id: i32,
    pub external_id: Option<String>,
    pub name: String,
    pub category: String,
    pub company_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub management_fee: Option<Decimal>,
    pub return_rate: Option<Decimal>,
    pub total_assets: Option<Decimal>,
    pub latest_report_period: Option<i32>,
}

impl FundSummary {
    pub fn new(fund: &funds::Model, company: Option<&companies::Model>) -> Self {
        Self {
            id: fund.id,
            external_id: fund.external_id.clone(),
            name: fund.name.clone(),
            category: fund.category.clone(),
            company_id: fund.company_id,
            company_name: company.map(|c| c.name.clone()),
            management_fee: fund.management_fee,
            return_rate: fund.return_rate,
            total_assets: fund.total_assets,
            latest_report_period: fund.latest_report_period,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundListResponse {
    pub funds: Vec<FundSummary>,
    /// Funds matching the filter, across all pages
    pub total: u64,
    pub page: u64,
    pub page_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    pub report_period: i32,
    /// `MM/YYYY`
    pub label: String,
    pub monthly_yield: Option<Decimal>,
    pub ytd_yield: Option<Decimal>,
    pub return_3yr: Option<Decimal>,
    pub return_5yr: Option<Decimal>,
    pub avg_annual_return_3yr: Option<Decimal>,
    pub avg_annual_return_5yr: Option<Decimal>,
    pub total_assets: Option<Decimal>,
    pub deposits: Option<Decimal>,
    pub withdrawals: Option<Decimal>,
    pub net_deposits: Option<Decimal>,
    pub internal_transfers: Option<Decimal>,
    pub net_monthly_deposits: Option<Decimal>,
    pub standard_deviation: Option<Decimal>,
    pub alpha: Option<Decimal>,
    pub sharpe_ratio: Option<Decimal>,
    pub liquid_assets_percent: Option<Decimal>,
    pub stock_market_exposure: Option<Decimal>,
    pub foreign_exposure: Option<Decimal>,
    pub foreign_currency_exposure: Option<Decimal>,
    pub avg_annual_management_fee: Option<Decimal>,
    pub avg_deposit_fee: Option<Decimal>,
}

impl From<fund_snapshots::Model> for SnapshotResponse {
    fn from(s: fund_snapshots::Model) -> Self {
        let label = ReportPeriod::new(s.report_period)
            .map(|p| p.label())
            .unwrap_or_else(|| s.report_period.to_string());

        Self {
            report_period: s.report_period,
            label,
            monthly_yield: s.monthly_yield,
            ytd_yield: s.ytd_yield,
            return_3yr: s.return_3yr,
            return_5yr: s.return_5yr,
            avg_annual_return_3yr: s.avg_annual_return_3yr,
            avg_annual_return_5yr: s.avg_annual_return_5yr,
            total_assets: s.total_assets,
            deposits: s.deposits,
            withdrawals: s.withdrawals,
            net_deposits: s.net_deposits,
            internal_transfers: s.internal_transfers,
            net_monthly_deposits: s.net_monthly_deposits,
            standard_deviation: s.standard_deviation,
            alpha: s.alpha,
            sharpe_ratio: s.sharpe_ratio,
            liquid_assets_percent: s.liquid_assets_percent,
            stock_market_exposure: s.stock_market_exposure,
            foreign_exposure: s.foreign_exposure,
            foreign_currency_exposure: s.foreign_currency_exposure,
            avg_annual_management_fee: s.avg_annual_management_fee,
            avg_deposit_fee: s.avg_deposit_fee,
        }
    }
}

/// One point of the fund page chart, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub label: String,
    pub monthly_yield: Option<Decimal>,
    pub total_assets: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundDetailResponse {
    #[serde(flatten)]
    pub summary: FundSummary,
    pub fund_classification: String,
    pub specialization: String,
    pub sub_specialization: String,
    pub inception_date: Option<NaiveDate>,
    /// Newest first
    pub snapshots: Vec<SnapshotResponse>,
    pub chart: Vec<ChartPoint>,
    pub period_tabs: Vec<PeriodTab>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotListResponse {
    pub fund_id: i32,
    pub snapshots: Vec<SnapshotResponse>,
}
