//! OKX bills → CSV ledger sync tool.
//!
//! Pulls the account bills archive from OKX, folds order fragments into
//! logical transactions, and appends everything newer than the local ledger's
//! watermark.

mod api;
mod ledger;
mod metrics;
mod models;
mod sync;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::api::{BillsClient, OkxCredentials};
use crate::metrics::PortfolioCalculator;
use crate::sync::{aggregate_bills, reconcile, SyncConfig, WatermarkMode};

/// OKX ledger sync CLI.
#[derive(Parser)]
#[command(name = "billsync")]
#[command(about = "Sync OKX account bills into a local CSV ledger", long_about = None)]
struct Cli {
    /// Credentials file (JSON with api_key, secret_key, passphrase)
    #[arg(short, long, default_value = "config.json", env = "BILLSYNC_CONFIG")]
    config: PathBuf,

    /// Ledger CSV path
    #[arg(short, long, default_value = "data/ledger.csv", env = "BILLSYNC_LEDGER")]
    ledger: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch new bills from OKX and append them to the ledger
    Sync {
        /// Bills per page
        #[arg(long, default_value = "100")]
        page_size: u32,

        /// Seconds to pause between pages
        #[arg(long, default_value = "1")]
        throttle: u64,

        /// Seconds to pause after a rate-limit response
        #[arg(long, default_value = "5")]
        cooldown: u64,

        /// Give up after this many consecutive rate-limit retries
        #[arg(long)]
        max_retries: Option<u32>,

        /// Also import entries sharing the last recorded timestamp
        #[arg(long)]
        include_equal_timestamps: bool,
    },

    /// Show a portfolio summary computed from the ledger
    Status {
        /// Savings target used for the progress figure
        #[arg(short, long, default_value = "120000")]
        target: Decimal,
    },

    /// Show the default sync configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Sync {
            page_size,
            throttle,
            cooldown,
            max_retries,
            include_equal_timestamps,
        } => {
            let config = SyncConfig {
                page_size,
                page_throttle: Duration::from_secs(throttle),
                rate_limit_cooldown: Duration::from_secs(cooldown),
                max_rate_limit_retries: max_retries,
                watermark_mode: if include_equal_timestamps {
                    WatermarkMode::Inclusive
                } else {
                    WatermarkMode::Exclusive
                },
                ..SyncConfig::default()
            };

            run_sync(&cli.config, &cli.ledger, config).await?;
        }

        Commands::Status { target } => {
            let entries = ledger::load(&cli.ledger)?;
            let status = PortfolioCalculator::calculate(&entries, target);

            println!("\n=== Portfolio Status ===");
            println!("Ledger:           {}", cli.ledger.display());
            println!("Entries:          {}", entries.len());

            println!("\n--- Capital ---");
            println!("Current Balance:  {:.2}", status.current_balance);
            println!("Initial Capital:  {:.2}", status.initial_capital);
            println!("Total Harvested:  {:.2}", status.total_harvested);

            println!("\n--- Trading ---");
            println!("Total P&L:        {:.2}", status.total_pnl);
            println!("Wins / Losses:    {} / {}", status.win_count, status.loss_count);
            println!("Win Rate:         {:.1}%", status.win_rate());

            println!("\n--- Target ---");
            println!("Target:           {:.2}", status.target);
            println!("Progress:         {:.2}%", status.progress());
        }

        Commands::Config => {
            let config = SyncConfig::default();

            println!("\n=== Sync Configuration ===\n");
            println!("Page Size:            {}", config.page_size);
            println!("Page Throttle:        {:?}", config.page_throttle);
            println!("Rate Limit Cooldown:  {:?}", config.rate_limit_cooldown);
            println!(
                "Max Rate Retries:     {}",
                config
                    .max_rate_limit_retries
                    .map_or("unbounded".to_string(), |n| n.to_string())
            );
            println!("Watermark Mode:       {:?}", config.watermark_mode);
            println!("Target:               {}", config.target);

            println!("\nCredentials file:     {}", cli.config.display());
            println!("Ledger file:          {}", cli.ledger.display());
        }
    }

    Ok(())
}

/// Full pipeline: fetch → aggregate → reconcile → append.
///
/// The ledger is written exactly once, after reconciliation, so a failed run
/// never leaves it partially merged.
async fn run_sync(config_path: &std::path::Path, ledger_path: &std::path::Path, config: SyncConfig) -> Result<()> {
    let credentials = OkxCredentials::load(config_path)?;

    let watermark = ledger::latest_timestamp(ledger_path)?;
    if let Some(ts) = watermark {
        println!("Latest local record: {}", ts.format("%Y-%m-%d %H:%M:%S"));
    }

    let watermark_mode = config.watermark_mode;
    let client = BillsClient::new(credentials, config)?;

    println!("Fetching bills archive from OKX...");
    let bills = client.fetch_all_bills().await?;
    println!("API returned {} raw bills", bills.len());

    let entries = aggregate_bills(&bills)?;
    println!(
        "Aggregated into {} transactions ({} fragments merged)",
        entries.len(),
        bills.len() - entries.len()
    );

    let fresh = reconcile(entries, watermark, watermark_mode);
    if fresh.is_empty() {
        println!("No records newer than the local ledger. All up to date.");
        return Ok(());
    }

    ledger::append(ledger_path, &fresh)?;
    info!(count = fresh.len(), ledger = %ledger_path.display(), "Ledger updated");
    println!("Imported {} new records into {}", fresh.len(), ledger_path.display());

    Ok(())
}
