//! Sync status service for tracking last successful sync times
//!
//! This service prevents redundant Gemelnet downloads on restart by tracking
//! when each sync job last ran successfully.

use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};

use crate::entities::sync_status::{self, Entity as SyncStatus};

/// Job names for tracking sync status
pub mod jobs {
    pub const GEMELNET_SYNC: &str = "gemelnet_sync";
}

/// Default minimum intervals between syncs (in seconds)
pub mod intervals {
    pub const GEMELNET_SYNC: i32 = 86400; // 24 hours (dataset is published monthly)
}

pub async fn get_status(
    db: &DatabaseConnection,
    job_name: &str,
) -> Result<Option<sync_status::Model>, DbErr> {
    SyncStatus::find()
        .filter(sync_status::Column::JobName.eq(job_name))
        .one(db)
        .await
}

/// Check if a sync job should run based on last successful sync time
///
/// Returns true if:
/// - No record exists for this job (first run)
/// - Last successful sync was more than min_interval_secs ago
pub async fn should_sync(db: &DatabaseConnection, job_name: &str) -> Result<bool, DbErr> {
    let Some(record) = get_status(db, job_name).await? else {
        tracing::info!(job = job_name, "First run detected, will sync");
        return Ok(true);
    };

    let Some(last_success) = record.last_success_at else {
        tracing::info!(job = job_name, "No previous successful sync, will sync");
        return Ok(true);
    };

    let elapsed = Utc::now().naive_utc().signed_duration_since(last_success);
    let interval = Duration::seconds(record.min_interval_secs as i64);

    if elapsed >= interval {
        tracing::info!(
            job = job_name,
            elapsed_secs = elapsed.num_seconds(),
            min_interval_secs = record.min_interval_secs,
            "Interval elapsed, will sync"
        );
        Ok(true)
    } else {
        tracing::info!(
            job = job_name,
            elapsed_secs = elapsed.num_seconds(),
            next_sync_in_secs = (interval - elapsed).num_seconds(),
            "Skipping sync"
        );
        Ok(false)
    }
}

/// Record a successful sync, with an optional JSON summary of its statistics
pub async fn record_success(
    db: &DatabaseConnection,
    job_name: &str,
    default_interval_secs: i32,
    stats: Option<String>,
) -> Result<(), DbErr> {
    let now = Utc::now().naive_utc();

    match get_status(db, job_name).await? {
        Some(record) => {
            let success_count = record.success_count;
            let mut active_model: sync_status::ActiveModel = record.into();
            active_model.last_success_at = Set(Some(now));
            active_model.last_attempt_at = Set(Some(now));
            active_model.last_error = Set(None);
            active_model.last_stats = Set(stats);
            active_model.success_count = Set(success_count + 1);
            active_model.update(db).await?;
        }
        None => {
            let new_record = sync_status::ActiveModel {
                job_name: Set(job_name.to_string()),
                last_success_at: Set(Some(now)),
                last_attempt_at: Set(Some(now)),
                last_error: Set(None),
                last_stats: Set(stats),
                success_count: Set(1),
                error_count: Set(0),
                min_interval_secs: Set(default_interval_secs),
                ..Default::default()
            };
            new_record.insert(db).await?;
        }
    }

    tracing::debug!(job = job_name, "Recorded successful sync");
    Ok(())
}

/// Record a failed sync attempt
pub async fn record_failure(
    db: &DatabaseConnection,
    job_name: &str,
    error: &str,
    default_interval_secs: i32,
) -> Result<(), DbErr> {
    let now = Utc::now().naive_utc();

    match get_status(db, job_name).await? {
        Some(record) => {
            let error_count = record.error_count;
            let mut active_model: sync_status::ActiveModel = record.into();
            active_model.last_attempt_at = Set(Some(now));
            active_model.last_error = Set(Some(error.to_string()));
            active_model.error_count = Set(error_count + 1);
            active_model.update(db).await?;
        }
        None => {
            let new_record = sync_status::ActiveModel {
                job_name: Set(job_name.to_string()),
                last_success_at: Set(None),
                last_attempt_at: Set(Some(now)),
                last_error: Set(Some(error.to_string())),
                last_stats: Set(None),
                success_count: Set(0),
                error_count: Set(1),
                min_interval_secs: Set(default_interval_secs),
                ..Default::default()
            };
            new_record.insert(db).await?;
        }
    }

    tracing::debug!(job = job_name, error, "Recorded failed sync");
    Ok(())
}
