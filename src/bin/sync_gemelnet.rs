use std::env;
use std::sync::Arc;

use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gemelnet_backend::jobs::gemelnet_sync::run_recorded_sync;
use gemelnet_backend::services::fund_sync::SyncOptions;
use gemelnet_backend::services::gemelnet::{BackfillSource, GemelnetConfig, GemelnetService};

const USAGE: &str = "Usage: cargo run --bin sync_gemelnet -- [--limit N] [--latest-only] [--dry-run] \
[--source recent|historical|both] [--resource ID]...";

struct Args {
    limit: Option<usize>,
    latest_only: bool,
    dry_run: bool,
    /// Explicit resources, in the order given
    resources: Vec<String>,
    source: Option<BackfillSource>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        limit: None,
        latest_only: false,
        dry_run: false,
        resources: Vec::new(),
        source: None,
    };

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--limit" => {
                let value = iter.next().ok_or("--limit needs a value")?;
                let limit = value
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| format!("Invalid --limit: {}", value))?;
                args.limit = Some(limit);
            }
            "--latest-only" => args.latest_only = true,
            "--dry-run" => args.dry_run = true,
            "--resource" => {
                args.resources.push(iter.next().ok_or("--resource needs a value")?);
            }
            "--source" => {
                let value = iter.next().ok_or("--source needs a value")?;
                let source = BackfillSource::parse(&value)
                    .ok_or_else(|| format!("Invalid --source: {} (recent, historical or both)", value))?;
                args.source = Some(source);
            }
            "-h" | "--help" => return Err(USAGE.to_string()),
            other => return Err(format!("Unknown argument: {}\n{}", other, USAGE)),
        }
    }

    Ok(args)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gemelnet_backend=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(2);
        }
    };

    let database_url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;
    tracing::info!("Connecting to database...");
    let db = Database::connect(&database_url).await?;
    migration::Migrator::up(&db, None).await?;

    let config = GemelnetConfig::from_env();
    let client = GemelnetService::new(&config)?;

    let mut options = SyncOptions::new(&config)
        .keep_history(!args.latest_only)
        .dry_run(args.dry_run);

    let mut resources = args.resources;
    if let Some(source) = args.source {
        resources.extend(source.resource_ids());
    }
    if !resources.is_empty() {
        options = options.resources(resources);
    }
    tracing::info!(resources = ?options.resource_ids, "Syncing Gemelnet resources");

    let report = run_recorded_sync(&db, Arc::new(client), options, args.limit).await?;
    let stats = &report.stats;

    println!();
    println!("Gemelnet sync {}", if report.dry_run { "(dry run, nothing saved)" } else { "complete" });
    println!("  Records fetched:    {}", stats.fetched);
    println!("  Unique funds:       {}", stats.unique_funds);
    println!("  Companies created:  {}", stats.companies_created);
    println!("  Companies updated:  {}", stats.companies_updated);
    println!("  Funds created:      {}", stats.funds_created);
    println!("  Funds updated:      {}", stats.funds_updated);
    println!("  Snapshots created:  {}", stats.snapshots_created);
    println!("  Snapshots skipped:  {}", stats.snapshots_skipped);
    println!("  Errors:             {}", stats.errors);

    if !report.failures.is_empty() {
        println!();
        println!("Failed funds:");
        for failure in &report.failures {
            println!("  {}: {}", failure.fund_id, failure.reason);
        }
    }

    Ok(())
}
