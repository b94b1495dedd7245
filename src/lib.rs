// src/lib.rs

use std::env;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use services::gemelnet::{DatasetClient, GemelnetConfig};
use tokio::sync::Mutex;

const ENV_ADMIN_API_TOKEN: &str = "ADMIN_API_TOKEN";

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub gemelnet: Arc<dyn DatasetClient>,
    pub gemelnet_config: GemelnetConfig,
    /// Required in `x-admin-token` by the admin endpoints; None disables them
    pub admin_token: Option<String>,
    /// Held for the duration of a sync so the job and the endpoint never overlap
    pub sync_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        gemelnet: Arc<dyn DatasetClient>,
        gemelnet_config: GemelnetConfig,
        admin_token: Option<String>,
    ) -> Self {
        Self {
            db,
            gemelnet,
            gemelnet_config,
            admin_token,
            sync_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn admin_token_from_env() -> Option<String> {
        env::var(ENV_ADMIN_API_TOKEN).ok().filter(|t| !t.is_empty())
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/funds", get(handlers::funds::list_funds))
        .route("/api/funds/{id}", get(handlers::funds::get_fund))
        .route(
            "/api/funds/{id}/snapshots",
            get(handlers::funds::get_fund_snapshots),
        )
        .route(
            "/api/portfolios/{id}/metrics",
            get(handlers::portfolios::get_portfolio_metrics),
        )
        .route(
            "/api/admin/gemelnet/sync",
            post(handlers::gemelnet_sync::trigger_sync),
        )
        .route(
            "/api/admin/gemelnet/sync-status",
            get(handlers::gemelnet_sync::get_sync_status),
        )
        .with_state(state)
}

pub mod entities {
    pub mod prelude;
    pub mod companies;
    pub mod funds;
    pub mod fund_snapshots;
    pub mod portfolios;
    pub mod portfolio_holdings;
    pub mod periodic_contributions;
    pub mod sync_status;
}

pub mod services {
    pub mod gemelnet;
    pub mod record_normalizer;
    pub mod fund_aggregator;
    pub mod fund_sync;
    pub mod fund_store;
    pub mod report_period;
    pub mod portfolio_metrics;
    pub mod sync_status;
}

pub mod models {
    pub mod error;
    pub mod fund;
    pub mod portfolio;
    pub mod sync;
}

pub mod handlers {
    pub mod funds;
    pub mod gemelnet_sync;
    pub mod portfolios;
}

pub mod jobs;
