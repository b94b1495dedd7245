use std::env;

use sea_orm::Database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gemelnet_backend::services::fund_store;
use gemelnet_backend::services::report_period::ReportPeriod;
use gemelnet_backend::services::sync_status::{self, jobs};

/// Periods listed in the distribution table
const DISTRIBUTION_ROWS: usize = 24;

fn period_label(period: Option<i32>) -> String {
    period
        .and_then(ReportPeriod::new)
        .map(|p| p.label())
        .unwrap_or_else(|| "-".to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let database_url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;
    let db = Database::connect(&database_url).await?;

    let stats = fund_store::store_stats(&db).await?;
    println!("Fund store");
    println!("  Companies:       {}", stats.companies);
    println!("  Funds:           {}", stats.funds);
    println!("  Snapshots:       {}", stats.snapshots);
    println!("  Earliest period: {}", period_label(stats.earliest_period));
    println!("  Latest period:   {}", period_label(stats.latest_period));

    let distribution = fund_store::period_distribution(&db).await?;
    if !distribution.is_empty() {
        println!();
        println!("Snapshots per period (latest {}):", DISTRIBUTION_ROWS);
        for (period, count) in distribution.iter().take(DISTRIBUTION_ROWS) {
            println!("  {}  {}", period_label(Some(*period)), count);
        }
    }

    let incoherent = fund_store::incoherent_funds(&db).await?;
    println!();
    if incoherent.is_empty() {
        println!("Cached fund values match their latest snapshots");
    } else {
        println!("{} funds have stale cached values:", incoherent.len());
        for fund in &incoherent {
            println!(
                "  #{} {} (cached period {})",
                fund.id,
                fund.name,
                period_label(fund.latest_report_period)
            );
        }
        if env::args().any(|a| a == "--fix") {
            let mut fixed = 0;
            for fund in incoherent {
                if fund_store::refresh_fund_cache(&db, fund).await? {
                    fixed += 1;
                }
            }
            println!("Refreshed {} funds", fixed);
        } else {
            println!("Run with --fix to refresh them");
        }
    }

    println!();
    match sync_status::get_status(&db, jobs::GEMELNET_SYNC).await? {
        Some(status) => {
            println!("Last sync");
            println!("  Last success: {:?}", status.last_success_at);
            println!("  Last attempt: {:?}", status.last_attempt_at);
            println!("  Successes:    {}", status.success_count);
            println!("  Failures:     {}", status.error_count);
            if let Some(error) = status.last_error {
                println!("  Last error:   {}", error);
            }
            if let Some(stats) = status.last_stats {
                println!("  Last stats:   {}", stats);
            }
        }
        None => println!("No Gemelnet sync has run yet"),
    }

    Ok(())
}
