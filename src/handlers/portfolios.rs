use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::error;

use crate::models::error::ErrorResponse;
use crate::models::portfolio::PortfolioMetricsQuery;
use crate::services::portfolio_metrics::{portfolio_metrics, MetricsError, PortfolioMetrics};
use crate::AppState;

/// Weighted return, profit/loss and contribution projections of a portfolio
///
/// GET /api/portfolios/{id}/metrics?months=24
pub async fn get_portfolio_metrics(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<PortfolioMetricsQuery>,
) -> Result<Json<PortfolioMetrics>, (StatusCode, Json<ErrorResponse>)> {
    let months = query
        .months()
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e))))?;

    let today = Utc::now().date_naive();

    let metrics = portfolio_metrics(&state.db, id, today, months)
        .await
        .map_err(|e| {
            let status = match e {
                MetricsError::PortfolioNotFound(_) => StatusCode::NOT_FOUND,
                MetricsError::UnknownInterval(_) | MetricsError::Database(_) => {
                    error!(portfolio_id = id, error = %e, "Failed to compute portfolio metrics");
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            (status, Json(ErrorResponse::new(e.to_string())))
        })?;

    Ok(Json(metrics))
}
