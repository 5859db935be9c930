//! # Dealer Service
//!
//! Long-running worker for the sales pipeline: opens the database, wires the
//! services and sweeps overdue quotations on an interval until shutdown.
//!
//! ## Usage
//! ```bash
//! dealer-service [--config dealer.toml]           # run the expiry sweep
//! dealer-service --report [--days 30]            # print sales analytics and exit
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use dealer_core::analytics::GroupBy;
use dealer_db::{Database, DbConfig};
use dealer_fx::CurrencyService;
use dealer_service::{telemetry, DealerServices, ServiceConfig};
use tracing::{error, info};

struct Args {
    config: Option<PathBuf>,
    report: bool,
    days: i64,
}

fn parse_args() -> Result<Option<Args>> {
    let mut args = Args {
        config: None,
        report: false,
        days: 30,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().context("--config needs a path")?;
                args.config = Some(PathBuf::from(path));
            }
            "--report" => args.report = true,
            "--days" => {
                let days = iter.next().context("--days needs a number")?;
                args.days = days.parse().context("--days must be a number")?;
                if args.days <= 0 {
                    bail!("--days must be greater than 0");
                }
            }
            "--help" | "-h" => {
                println!("Usage: dealer-service [--config PATH] [--report] [--days N]");
                println!();
                println!("Options:");
                println!("  --config PATH  Configuration file (default: platform config dir)");
                println!("  --report       Print sales analytics for the last N days and exit");
                println!("  --days N       Report window in days (default: 30)");
                return Ok(None);
            }
            other => bail!("Unknown argument: {}", other),
        }
    }

    Ok(Some(args))
}

#[tokio::main]
async fn main() -> Result<()> {
    let Some(args) = parse_args()? else {
        return Ok(());
    };

    let config = ServiceConfig::load(args.config).context("Failed to load configuration")?;
    telemetry::init(&config.logging);

    let db_path = config.database.resolved_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    info!(path = %db_path.display(), "Opening database");

    let db = Database::new(
        DbConfig::new(&db_path).max_connections(config.database.max_connections),
    )
    .await?;
    let fx = Arc::new(CurrencyService::from_config(config.currency.clone())?);
    let services = DealerServices::new(db.clone(), fx, &config);

    if args.report {
        let today = Utc::now().date_naive();
        let from = today - chrono::Duration::days(args.days - 1);
        let report = services
            .analytics
            .get_sales_analytics(from, today, GroupBy::Day, None)
            .await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        db.close().await;
        return Ok(());
    }

    let interval = Duration::from_secs(config.quotation.expiry_sweep_secs);
    info!(interval_secs = interval.as_secs(), "Starting expiry sweep");

    tokio::select! {
        _ = sweep_loop(&services, interval) => {},
        _ = shutdown_signal() => {},
    }

    db.close().await;
    info!("Shutdown complete");
    Ok(())
}

async fn sweep_loop(services: &DealerServices, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        match services.quotations.expire_overdue(Utc::now()).await {
            Ok(expired) if !expired.is_empty() => {
                info!(count = expired.len(), "Expired overdue quotations");
            }
            Ok(_) => {}
            Err(e) => error!(code = ?e.kind, "Expiry sweep failed: {}", e),
        }
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
