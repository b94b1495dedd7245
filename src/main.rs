use std::env;
use std::sync::Arc;

use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gemelnet_backend::jobs::gemelnet_sync;
use gemelnet_backend::services::gemelnet::{GemelnetConfig, GemelnetService};
use gemelnet_backend::AppState;

const ENV_DATABASE_URL: &str = "DATABASE_URL";
const ENV_BIND_ADDRESS: &str = "BIND_ADDRESS";
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gemelnet_backend=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let database_url = env::var(ENV_DATABASE_URL).map_err(|_| "DATABASE_URL must be set")?;
    tracing::info!("Connecting to database...");
    let db = Database::connect(&database_url).await?;

    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None).await?;

    let gemelnet_config = GemelnetConfig::from_env();
    let gemelnet = GemelnetService::new(&gemelnet_config)?;
    tracing::info!(
        api_url = gemelnet.api_url(),
        resource_id = %gemelnet_config.resource_id,
        batch_size = gemelnet_config.batch_size,
        "Gemelnet client configured"
    );

    let admin_token = AppState::admin_token_from_env();
    if admin_token.is_none() {
        tracing::warn!("ADMIN_API_TOKEN not set, admin endpoints are disabled");
    }

    let state = AppState::new(db, Arc::new(gemelnet), gemelnet_config, admin_token);

    if gemelnet_sync::sync_enabled() {
        gemelnet_sync::start_gemelnet_sync_job(state.clone()).await;
        tracing::info!("Gemelnet sync job started");
    } else {
        tracing::info!("Gemelnet sync job disabled (GEMELNET_SYNC_ENABLED=false)");
    }

    let app = gemelnet_backend::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let bind_address = env::var(ENV_BIND_ADDRESS).unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string());
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
