use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::entities::sync_status;

/// Body of POST /api/admin/gemelnet/sync. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    /// Fetch a single page of this many records
    pub limit: Option<usize>,
    /// Defaults to true (full history)
    pub keep_history: Option<bool>,
    pub dry_run: Option<bool>,
}

impl SyncRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.limit == Some(0) {
            return Err("limit must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusResponse {
    pub job_name: String,
    pub running: bool,
    pub last_success_at: Option<NaiveDateTime>,
    pub last_attempt_at: Option<NaiveDateTime>,
    pub last_error: Option<String>,
    /// Statistics of the last successful run
    pub last_stats: Option<serde_json::Value>,
    pub success_count: i64,
    pub error_count: i64,
    pub min_interval_secs: i32,
}

impl SyncStatusResponse {
    pub fn never_run(job_name: &str, running: bool) -> Self {
        Self {
            job_name: job_name.to_string(),
            running,
            last_success_at: None,
            last_attempt_at: None,
            last_error: None,
            last_stats: None,
            success_count: 0,
            error_count: 0,
            min_interval_secs: 0,
        }
    }

    pub fn from_model(model: sync_status::Model, running: bool) -> Self {
        Self {
            job_name: model.job_name,
            running,
            last_success_at: model.last_success_at,
            last_attempt_at: model.last_attempt_at,
            last_error: model.last_error,
            last_stats: model
                .last_stats
                .as_deref()
                .and_then(|s| serde_json::from_str(s).ok()),
            success_count: model.success_count,
            error_count: model.error_count,
            min_interval_secs: model.min_interval_secs,
        }
    }
}
