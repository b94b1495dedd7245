use std::env;
use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tokio::time::{interval, Duration};

use crate::services::fund_sync::{FundSyncService, SyncError, SyncOptions, SyncReport};
use crate::services::gemelnet::DatasetClient;
use crate::services::sync_status::{self, intervals, jobs};
use crate::AppState;

const ENV_SYNC_ENABLED: &str = "GEMELNET_SYNC_ENABLED";
const ENV_SYNC_KEEP_HISTORY: &str = "GEMELNET_SYNC_KEEP_HISTORY";

/// How often the job wakes up to check whether a sync is due
const CHECK_INTERVAL_SECS: u64 = 3600;

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

pub fn sync_enabled() -> bool {
    env_flag(ENV_SYNC_ENABLED, true)
}

/// Options for scheduled runs: full history unless `GEMELNET_SYNC_KEEP_HISTORY=false`.
pub fn scheduled_options(state: &AppState) -> SyncOptions {
    SyncOptions::new(&state.gemelnet_config).keep_history(env_flag(ENV_SYNC_KEEP_HISTORY, true))
}

/// Run one sync and record the outcome in `sync_status`. Dry runs leave no
/// bookkeeping behind.
pub async fn run_recorded_sync(
    db: &DatabaseConnection,
    client: Arc<dyn DatasetClient>,
    options: SyncOptions,
    limit: Option<usize>,
) -> Result<SyncReport, SyncError> {
    let dry_run = options.dry_run;
    let service = FundSyncService::new(db.clone(), client, options);

    match service.sync(limit).await {
        Ok(report) => {
            if !dry_run {
                let stats = serde_json::to_string(&report.stats).ok();
                if let Err(e) = sync_status::record_success(
                    db,
                    jobs::GEMELNET_SYNC,
                    intervals::GEMELNET_SYNC,
                    stats,
                )
                .await
                {
                    tracing::warn!(error = %e, "Failed to record sync success");
                }
            }
            Ok(report)
        }
        Err(e) => {
            if !dry_run {
                if let Err(e2) = sync_status::record_failure(
                    db,
                    jobs::GEMELNET_SYNC,
                    &e.to_string(),
                    intervals::GEMELNET_SYNC,
                )
                .await
                {
                    tracing::warn!(error = %e2, "Failed to record sync failure");
                }
            }
            Err(e)
        }
    }
}

async fn run_if_due(state: &AppState) {
    match sync_status::should_sync(&state.db, jobs::GEMELNET_SYNC).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!("Skipping scheduled Gemelnet sync (recently synced)");
            return;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to check sync status");
            return;
        }
    }

    // A manual run holds the lock; the next tick will look again
    let Ok(_guard) = state.sync_lock.try_lock() else {
        tracing::info!("Gemelnet sync already running, skipping scheduled run");
        return;
    };

    tracing::info!("Starting scheduled Gemelnet sync");
    match run_recorded_sync(&state.db, state.gemelnet.clone(), scheduled_options(state), None).await {
        Ok(report) => tracing::info!(
            snapshots_created = report.stats.snapshots_created,
            errors = report.stats.errors,
            "Scheduled Gemelnet sync complete"
        ),
        Err(e) => tracing::error!(error = %e, "Scheduled Gemelnet sync failed"),
    }
}

pub async fn start_gemelnet_sync_job(state: AppState) {
    tokio::spawn(async move {
        let mut interval = interval(Duration::from_secs(CHECK_INTERVAL_SECS));

        // The first tick completes immediately, which covers the startup check
        loop {
            interval.tick().await;
            run_if_due(&state).await;
        }
    });
}
