//! Fund read API

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sea_orm::{DbErr, EntityTrait};
use tracing::{error, warn};

use crate::entities::prelude::*;
use crate::models::error::ErrorResponse;
use crate::models::fund::{
    ChartPoint, FundDetailResponse, FundListQuery, FundListResponse, FundSummary,
    SnapshotListResponse, SnapshotRangeQuery, SnapshotResponse,
};
use crate::services::fund_store::{self, FundFilter, FUNDS_PER_PAGE};
use crate::services::record_normalizer::FundCategory;
use crate::services::report_period::ReportPeriod;
use crate::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn db_error(e: DbErr) -> ApiError {
    error!(error = %e, "Fund query failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(format!("Database error: {}", e))),
    )
}

fn not_found(id: i32) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(format!("Fund {} not found", id))),
    )
}

/// List funds, 24 per page
///
/// GET /api/funds?category=stocks&company_id=3&search=הראל&page=2
pub async fn list_funds(
    State(state): State<AppState>,
    Query(query): Query<FundListQuery>,
) -> Result<Json<FundListResponse>, ApiError> {
    let page = query
        .page()
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e))))?;

    let category = match query.category.as_deref() {
        None | Some("") => None,
        Some(slug) => match FundCategory::from_slug(slug) {
            Some(category) => Some(category),
            None => {
                warn!(category = slug, "Unknown fund category");
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse::new(format!("Unknown category: {}", slug))),
                ));
            }
        },
    };

    let filter = FundFilter {
        category,
        company_id: query.company_id,
        search: query.search.clone(),
    };

    let (rows, total) = fund_store::list_funds(&state.db, &filter, page)
        .await
        .map_err(db_error)?;

    let funds = rows
        .iter()
        .map(|(fund, company)| FundSummary::new(fund, company.as_ref()))
        .collect();

    Ok(Json(FundListResponse {
        funds,
        total,
        page,
        page_count: total.div_ceil(FUNDS_PER_PAGE),
    }))
}

/// Fund page data: the fund, all snapshots (newest first), a chart series
/// (oldest first) and five-year period tabs.
///
/// GET /api/funds/{id}
pub async fn get_fund(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<FundDetailResponse>, ApiError> {
    let (fund, company) = Funds::find_by_id(id)
        .find_also_related(Companies)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found(id))?;

    let snapshots = fund_store::snapshots_in_range(&state.db, id, None, None)
        .await
        .map_err(db_error)?;
    let period_tabs = fund_store::period_tabs(&state.db, id)
        .await
        .map_err(db_error)?;

    let chart = snapshots
        .iter()
        .map(|s| ChartPoint {
            label: ReportPeriod::new(s.report_period)
                .map(|p| p.label())
                .unwrap_or_else(|| s.report_period.to_string()),
            monthly_yield: s.monthly_yield,
            total_assets: s.total_assets,
        })
        .collect();

    let snapshots = snapshots
        .into_iter()
        .rev()
        .map(SnapshotResponse::from)
        .collect();

    Ok(Json(FundDetailResponse {
        summary: FundSummary::new(&fund, company.as_ref()),
        fund_classification: fund.fund_classification,
        specialization: fund.specialization,
        sub_specialization: fund.sub_specialization,
        inception_date: fund.inception_date,
        snapshots,
        chart,
        period_tabs,
    }))
}

/// Snapshots in a period range, oldest first
///
/// GET /api/funds/{id}/snapshots?start=202101&end=202512
pub async fn get_fund_snapshots(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<SnapshotRangeQuery>,
) -> Result<Json<SnapshotListResponse>, ApiError> {
    let (start, end) = query
        .validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e))))?;

    Funds::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found(id))?;

    let snapshots = fund_store::snapshots_in_range(&state.db, id, start, end)
        .await
        .map_err(db_error)?;

    Ok(Json(SnapshotListResponse {
        fund_id: id,
        snapshots: snapshots.into_iter().map(SnapshotResponse::from).collect(),
    }))
}
