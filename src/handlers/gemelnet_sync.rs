//! Gemelnet sync admin handlers
//!
//! POST /api/admin/gemelnet/sync and GET /api/admin/gemelnet/sync-status.
//! Both require the `x-admin-token` header to match `ADMIN_API_TOKEN`.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use tracing::{error, info, warn};

use crate::jobs::gemelnet_sync::run_recorded_sync;
use crate::models::error::ErrorResponse;
use crate::models::sync::{SyncRequest, SyncStatusResponse};
use crate::services::fund_sync::{SyncError, SyncOptions, SyncReport};
use crate::services::sync_status::{self, jobs};
use crate::AppState;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

type ApiError = (StatusCode, Json<ErrorResponse>);

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.admin_token.as_deref() else {
        warn!("Admin request rejected: ADMIN_API_TOKEN is not configured");
        return Err((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new("Admin API is disabled")),
        ));
    };

    match headers.get(ADMIN_TOKEN_HEADER).and_then(|v| v.to_str().ok()) {
        None => Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Missing admin token")),
        )),
        Some(token) if token == expected => Ok(()),
        Some(_) => {
            warn!("Admin request rejected: invalid token");
            Err((
                StatusCode::FORBIDDEN,
                Json(ErrorResponse::new("Invalid admin token")),
            ))
        }
    }
}

/// Run a Gemelnet sync now
///
/// POST /api/admin/gemelnet/sync
///
/// # Request
///
/// ```json
/// { "limit": 500, "keepHistory": true, "dryRun": false }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "stats": {
///     "fetched": 500,
///     "uniqueFunds": 120,
///     "companiesCreated": 3,
///     "companiesUpdated": 0,
///     "fundsCreated": 120,
///     "fundsUpdated": 0,
///     "snapshotsCreated": 498,
///     "snapshotsSkipped": 0,
///     "errors": 2
///   },
///   "failures": [{ "fundId": "1234", "reason": "missing company legal id or name" }],
///   "dryRun": false
/// }
/// ```
///
/// 409 while another sync is running, 502 when the Gemelnet API fails.
pub async fn trigger_sync(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SyncRequest>,
) -> Result<Json<SyncReport>, ApiError> {
    authorize(&state, &headers)?;

    if let Err(e) = request.validate() {
        return Err((StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e))));
    }

    let Ok(_guard) = state.sync_lock.try_lock() else {
        return Err((
            StatusCode::CONFLICT,
            Json(ErrorResponse::new("A Gemelnet sync is already running")),
        ));
    };

    let options = SyncOptions::new(&state.gemelnet_config)
        .keep_history(request.keep_history.unwrap_or(true))
        .dry_run(request.dry_run.unwrap_or(false));

    info!(
        limit = ?request.limit,
        keep_history = options.keep_history,
        dry_run = options.dry_run,
        "Manual Gemelnet sync requested"
    );

    let report = run_recorded_sync(&state.db, state.gemelnet.clone(), options, request.limit)
        .await
        .map_err(|e| {
            error!(error = %e, "Manual Gemelnet sync failed");
            let status = match e {
                SyncError::Fetch(_) => StatusCode::BAD_GATEWAY,
                SyncError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(ErrorResponse::new(e.to_string())))
        })?;

    Ok(Json(report))
}

/// Last recorded run of the Gemelnet sync job
///
/// GET /api/admin/gemelnet/sync-status
pub async fn get_sync_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SyncStatusResponse>, ApiError> {
    authorize(&state, &headers)?;

    let running = state.sync_lock.try_lock().is_err();

    let status = sync_status::get_status(&state.db, jobs::GEMELNET_SYNC)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to load sync status");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(format!("Database error: {}", e))),
            )
        })?;

    Ok(Json(match status {
        Some(model) => SyncStatusResponse::from_model(model, running),
        None => SyncStatusResponse::never_run(jobs::GEMELNET_SYNC, running),
    }))
}
