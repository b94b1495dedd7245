//! Read and maintenance queries over the fund store.
//!
//! Everything here is generic over `ConnectionTrait` so the sync engine can
//! run the same queries inside its per-fund transaction.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;

use crate::entities::{companies, fund_snapshots, funds, prelude::*};
use crate::services::record_normalizer::{map_category, FundCategory, NormalizedRecord};
use crate::services::report_period::{five_year_tabs, PeriodTab, ReportPeriod};

/// Cached-field values a fund must carry given its max-period snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedValues {
    pub return_rate: Option<Decimal>,
    pub total_assets: Option<Decimal>,
    pub latest_report_period: Option<i32>,
}

impl CachedValues {
    /// Values as stored on the fund, rounded to 2 decimal places.
    pub fn new(
        return_rate: Option<Decimal>,
        total_assets: Option<Decimal>,
        latest_report_period: Option<i32>,
    ) -> Self {
        Self {
            return_rate: return_rate.map(|d| d.round_dp(2)),
            total_assets: total_assets.map(|d| d.round_dp(2)),
            latest_report_period,
        }
    }

    pub fn from_snapshot(snapshot: &fund_snapshots::Model) -> Self {
        Self::new(
            snapshot
                .avg_annual_return_5yr
                .or(snapshot.avg_annual_return_3yr),
            snapshot.total_assets,
            Some(snapshot.report_period),
        )
    }

    pub fn from_record(record: &NormalizedRecord) -> Self {
        Self::new(
            record.metrics.headline_return(),
            record.metrics.total_assets,
            record.report_period.map(|p| p.value()),
        )
    }

    pub fn of_fund(fund: &funds::Model) -> Self {
        Self::new(fund.return_rate, fund.total_assets, fund.latest_report_period)
    }
}

pub async fn latest_snapshot<C: ConnectionTrait>(
    conn: &C,
    fund_id: i32,
) -> Result<Option<fund_snapshots::Model>, DbErr> {
    FundSnapshots::find()
        .filter(fund_snapshots::Column::FundId.eq(fund_id))
        .order_by_desc(fund_snapshots::Column::ReportPeriod)
        .one(conn)
        .await
}

/// Snapshots of a fund between two periods (inclusive), oldest first.
pub async fn snapshots_in_range<C: ConnectionTrait>(
    conn: &C,
    fund_id: i32,
    start: Option<ReportPeriod>,
    end: Option<ReportPeriod>,
) -> Result<Vec<fund_snapshots::Model>, DbErr> {
    let mut query = FundSnapshots::find().filter(fund_snapshots::Column::FundId.eq(fund_id));

    if let Some(start) = start {
        query = query.filter(fund_snapshots::Column::ReportPeriod.gte(start.value()));
    }
    if let Some(end) = end {
        query = query.filter(fund_snapshots::Column::ReportPeriod.lte(end.value()));
    }

    query
        .order_by_asc(fund_snapshots::Column::ReportPeriod)
        .all(conn)
        .await
}

/// Five-year tabs spanning a fund's snapshot history, newest first.
pub async fn period_tabs<C: ConnectionTrait>(
    conn: &C,
    fund_id: i32,
) -> Result<Vec<PeriodTab>, DbErr> {
    let bounds: Option<(Option<i32>, Option<i32>)> = FundSnapshots::find()
        .select_only()
        .column_as(fund_snapshots::Column::ReportPeriod.min(), "earliest")
        .column_as(fund_snapshots::Column::ReportPeriod.max(), "latest")
        .filter(fund_snapshots::Column::FundId.eq(fund_id))
        .into_tuple()
        .one(conn)
        .await?;

    let tabs = match bounds {
        Some((Some(earliest), Some(latest))) => {
            match (ReportPeriod::new(earliest), ReportPeriod::new(latest)) {
                (Some(earliest), Some(latest)) => five_year_tabs(earliest, latest),
                _ => Vec::new(),
            }
        }
        _ => Vec::new(),
    };

    Ok(tabs)
}

/// Snapshot count per report period, newest period first.
pub async fn period_distribution<C: ConnectionTrait>(conn: &C) -> Result<Vec<(i32, i64)>, DbErr> {
    FundSnapshots::find()
        .select_only()
        .column(fund_snapshots::Column::ReportPeriod)
        .column_as(fund_snapshots::Column::Id.count(), "count")
        .group_by(fund_snapshots::Column::ReportPeriod)
        .order_by_desc(fund_snapshots::Column::ReportPeriod)
        .into_tuple()
        .all(conn)
        .await
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    pub companies: u64,
    pub funds: u64,
    pub snapshots: u64,
    pub earliest_period: Option<i32>,
    pub latest_period: Option<i32>,
}

pub async fn store_stats<C: ConnectionTrait>(conn: &C) -> Result<StoreStats, DbErr> {
    let companies = Companies::find().count(conn).await?;
    let funds = Funds::find().count(conn).await?;
    let snapshots = FundSnapshots::find().count(conn).await?;

    let bounds: Option<(Option<i32>, Option<i32>)> = FundSnapshots::find()
        .select_only()
        .column_as(fund_snapshots::Column::ReportPeriod.min(), "earliest")
        .column_as(fund_snapshots::Column::ReportPeriod.max(), "latest")
        .into_tuple()
        .one(conn)
        .await?;
    let (earliest_period, latest_period) = bounds.unwrap_or((None, None));

    Ok(StoreStats {
        companies,
        funds,
        snapshots,
        earliest_period,
        latest_period,
    })
}

/// Bring a fund's cached fields in line with its max-period snapshot.
/// Returns whether anything was written.
pub async fn refresh_fund_cache<C: ConnectionTrait>(
    conn: &C,
    fund: funds::Model,
) -> Result<bool, DbErr> {
    let Some(snapshot) = latest_snapshot(conn, fund.id).await? else {
        return Ok(false);
    };

    let expected = CachedValues::from_snapshot(&snapshot);
    if CachedValues::of_fund(&fund) == expected {
        return Ok(false);
    }

    let mut active = fund.into_active_model();
    active.return_rate = Set(expected.return_rate);
    active.total_assets = Set(expected.total_assets);
    active.latest_report_period = Set(expected.latest_report_period);
    active.updated_at = Set(Utc::now().naive_utc());
    active.update(conn).await?;

    Ok(true)
}

/// Funds whose cached fields disagree with their max-period snapshot.
pub async fn incoherent_funds<C: ConnectionTrait>(conn: &C) -> Result<Vec<funds::Model>, DbErr> {
    let mut incoherent = Vec::new();

    for fund in Funds::find().all(conn).await? {
        if let Some(snapshot) = latest_snapshot(conn, fund.id).await? {
            if CachedValues::of_fund(&fund) != CachedValues::from_snapshot(&snapshot) {
                incoherent.push(fund);
            }
        }
    }

    Ok(incoherent)
}

/// Recompute every fund's category from its stored classification text.
/// Returns the number of funds whose category changed.
pub async fn recategorize_funds<C: ConnectionTrait>(conn: &C) -> Result<usize, DbErr> {
    let mut changed = 0;

    for fund in Funds::find().all(conn).await? {
        let category = map_category(&fund.fund_classification, &fund.specialization);
        if fund.category == category.as_str() {
            continue;
        }

        tracing::debug!(
            fund_id = fund.id,
            from = %fund.category,
            to = %category,
            "Recategorizing fund"
        );

        Funds::update_many()
            .col_expr(funds::Column::Category, Expr::value(category.as_str()))
            .col_expr(funds::Column::UpdatedAt, Expr::value(Utc::now().naive_utc()))
            .filter(funds::Column::Id.eq(fund.id))
            .exec(conn)
            .await?;
        changed += 1;
    }

    Ok(changed)
}

/// Funds per page of the fund list
pub const FUNDS_PER_PAGE: u64 = 24;

#[derive(Debug, Clone, Default)]
pub struct FundFilter {
    pub category: Option<FundCategory>,
    pub company_id: Option<i32>,
    /// Case-insensitive substring of the fund or company name
    pub search: Option<String>,
}

/// One page (1-based) of funds with their company, ordered by name, and the
/// number of funds matching the filter.
pub async fn list_funds<C: ConnectionTrait>(
    conn: &C,
    filter: &FundFilter,
    page: u64,
) -> Result<(Vec<(funds::Model, Option<companies::Model>)>, u64), DbErr> {
    let mut query = Funds::find().find_also_related(Companies);

    if let Some(category) = filter.category {
        query = query.filter(funds::Column::Category.eq(category.as_str()));
    }
    if let Some(company_id) = filter.company_id {
        query = query.filter(funds::Column::CompanyId.eq(company_id));
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search.to_lowercase());
        query = query.filter(
            Condition::any()
                .add(
                    Expr::expr(Func::lower(Expr::col((Funds, funds::Column::Name))))
                        .like(pattern.clone()),
                )
                .add(
                    Expr::expr(Func::lower(Expr::col((Companies, companies::Column::Name))))
                        .like(pattern),
                ),
        );
    }

    let total = query.clone().count(conn).await?;

    let funds = query
        .order_by_asc(funds::Column::Name)
        .order_by_asc(funds::Column::Id)
        .offset(page.saturating_sub(1) * FUNDS_PER_PAGE)
        .limit(FUNDS_PER_PAGE)
        .all(conn)
        .await?;

    Ok((funds, total))
}
