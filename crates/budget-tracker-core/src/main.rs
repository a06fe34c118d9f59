//! Budget Tracker CLI
//!
//! Runs the HTTP API and alert sweeper, applies migrations and performs
//! one-off maintenance against the budget database.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use budget_tracker::alerting::SweepReport;
use budget_tracker::api::{AppState, HttpServer};
use budget_tracker::clock::{Clock, SystemClock};
use budget_tracker::db::Database;
use budget_tracker::Config;

/// Budget Tracker - spending limits and threshold alerts
#[derive(Parser)]
#[command(name = "budget-tracker")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "BUDGET_TRACKER_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API and the periodic alert sweep
    Serve {
        /// HTTP API port (overrides configuration)
        #[arg(long, env = "BUDGET_TRACKER_HTTP_PORT")]
        http_port: Option<u16>,
    },

    /// Apply database migrations
    Migrate,

    /// Run one alert sweep and print the report
    Sweep {
        /// Only check budgets of this customer
        #[arg(long)]
        cif_id: Option<String>,
    },

    /// Delete alerts created before the given age (e.g. "90d")
    PurgeAlerts {
        #[arg(long, value_parser = humantime::parse_duration)]
        older_than: Duration,
    },

    /// Check database connectivity
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config, cli.verbose);

    let result = match cli.command {
        Commands::Serve { http_port } => run_serve(config, http_port).await,
        Commands::Migrate => run_migrate(config).await,
        Commands::Sweep { cif_id } => run_sweep(config, cif_id).await,
        Commands::PurgeAlerts { older_than } => run_purge_alerts(config, older_than).await,
        Commands::Health => run_health(config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(config: &Config, verbose: bool) {
    let level = if verbose { "debug" } else { config.logging.level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn state(db: &Database, config: &Config) -> AppState {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    AppState::new(db, &config.alerting, clock)
}

async fn run_serve(mut config: Config, http_port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = http_port {
        config.server.http_port = port;
    }

    let db = Database::new(&config).await?;
    db.migrate().await?;

    let state = state(&db, &config);

    let sweeper = if config.alerting.sweep_enabled {
        Some(tokio::spawn(
            state.evaluator.clone().start(config.alerting.sweep_interval),
        ))
    } else {
        warn!("Periodic alert sweep disabled");
        None
    };

    info!("Starting budget tracker on {}", config.http_addr());
    let served = HttpServer::new(state).serve(&config.http_addr()).await;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    served?;
    Ok(())
}

async fn run_migrate(config: Config) -> anyhow::Result<()> {
    let db = Database::new(&config).await?;
    db.migrate().await?;
    println!("Migrations applied");
    Ok(())
}

async fn run_sweep(config: Config, cif_id: Option<String>) -> anyhow::Result<()> {
    let db = Database::new(&config).await?;
    let state = state(&db, &config);

    let report = match cif_id {
        Some(cif_id) => state.evaluator.check_owner(&cif_id).await?,
        None => state.evaluator.sweep().await?,
    };

    print_report(&report)?;
    Ok(())
}

fn print_report(report: &SweepReport) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

async fn run_purge_alerts(config: Config, older_than: Duration) -> anyhow::Result<()> {
    let db = Database::new(&config).await?;
    let cutoff = SystemClock.now() - chrono::Duration::from_std(older_than)?;

    let deleted = db.alerts.delete_older_than(cutoff).await?;
    info!(deleted, %cutoff, "Purged budget alerts");
    println!("Deleted {deleted} alert(s) created before {cutoff}");
    Ok(())
}

async fn run_health(config: Config) -> anyhow::Result<()> {
    let db = Database::new(&config).await?;
    db.health_check().await?;
    println!("Database: connected");
    Ok(())
}
