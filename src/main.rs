// src/main.rs
mod edgar;
mod fmp;
mod loader;
mod storage;
mod utils;

use chrono::{Datelike, Utc};
use clap::{Parser, Subcommand};
use edgar::client::{EdgarClient, DEFAULT_USER_AGENT};
use edgar::directory::TickerDirectory;
use edgar::locator::{self, LocateOptions};
use fmp::{transform, FmpClient};
use std::path::PathBuf;
use std::time::Duration;
use storage::StorageManager;
use utils::AppError;

/// Earnings-release locator and financial-metrics ETL
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find the most recent earnings-release document in a company's 8-K filings
    Locate {
        /// Ticker symbol of the company
        #[arg(short, long)]
        ticker: String,

        /// Local copy of the SEC ticker directory; fetched once when missing
        #[arg(long, default_value = "cik_map.json")]
        cache_path: PathBuf,

        /// Identity sent to the SEC with every request ("Name contact@email")
        #[arg(long, env = "EDGAR_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
        user_agent: String,

        /// Most recent qualifying filings to inspect
        #[arg(long, default_value_t = 40)]
        max_filings: usize,

        /// Pause between filings without a match, in milliseconds
        #[arg(long, default_value_t = 120)]
        delay_ms: u64,
    },

    /// Pull the last N fiscal years of statement metrics into a tall CSV
    Metrics {
        /// Ticker symbol of the company
        #[arg(short, long)]
        ticker: String,

        /// Financial Modeling Prep API key
        #[arg(long, env = "FMP_API_KEY", hide_env_values = true)]
        api_key: String,

        /// Number of completed fiscal years to keep
        #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..=50))]
        years: u32,

        /// Also export the derived fd_market_cap and net_debt metrics
        #[arg(long)]
        include_derived: bool,

        /// Output directory for the CSV (default: ~/Downloads)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Upsert the newest staged metrics CSV into financial_metrics
    Load {
        /// Ticker symbol of the company
        #[arg(short, long)]
        ticker: String,

        /// Postgres connection string
        #[arg(long, env = "PG_URL", hide_env_values = true)]
        pg_url: Option<String>,

        /// Explicit CSV to load instead of the newest staged one
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Fiscal-year count in the staged file name
        #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..=50))]
        years: u32,

        /// Directory holding staged CSVs (default: ~/Downloads)
        #[arg(short, long)]
        input_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Pick up PG_URL / FMP_API_KEY / EDGAR_USER_AGENT from .env if present
    dotenv::dotenv().ok();

    // 2. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 3. Parse CLI Arguments
    let args = Args::parse();
    tracing::debug!("Starting with args: {:?}", args);

    match args.command {
        Command::Locate { ticker, cache_path, user_agent, max_filings, delay_ms } => {
            let client = EdgarClient::new(&user_agent)?;
            let directory = TickerDirectory::load(&client, &cache_path).await?;
            let options = LocateOptions {
                max_filings,
                request_delay: Duration::from_millis(delay_ms),
                ..LocateOptions::default()
            };

            match locator::latest_release(&client, &directory, &ticker, &options).await? {
                Some(release) => {
                    println!("{}", serde_json::to_string_pretty(&release)?);
                }
                None => {
                    tracing::info!("No earnings release found for {}", ticker.to_uppercase());
                    println!("null");
                }
            }
        }

        Command::Metrics { ticker, api_key, years, include_derived, output_dir } => {
            let storage = StorageManager::new(output_dir.unwrap_or_else(StorageManager::default_dir))?;
            let client = FmpClient::new(api_key)?;

            let today = Utc::now().date_naive();
            let window = transform::fiscal_window(today.year(), years);
            tracing::info!("Fetching FY{:?} metrics for {}", window, ticker.to_uppercase());

            let statements = client.statements(&ticker).await?;
            let rows = transform::to_tall(&statements, &window, include_derived);

            let path = storage.metrics_csv_path(&ticker, years, today);
            storage.save_metrics(&rows, &path)?;
            println!("Wrote {} rows -> {}", rows.len(), path.display());
        }

        Command::Load { ticker, pg_url, csv, years, input_dir } => {
            let pg_url = pg_url
                .ok_or_else(|| AppError::Config("Set PG_URL pointing at your Postgres database".to_string()))?;

            let csv_path = match csv {
                Some(path) => path,
                None => {
                    let dir = input_dir.unwrap_or_else(StorageManager::default_dir);
                    StorageManager::new(&dir)?
                        .latest_metrics_csv(&ticker, years)?
                        .ok_or_else(|| {
                            AppError::Config(format!(
                                "No {}_last{}_metrics_*.csv in {} - run the metrics command first",
                                ticker.to_uppercase(),
                                years,
                                dir.display()
                            ))
                        })?
                }
            };

            let rows = StorageManager::read_metrics(&csv_path)?;
            let mut pg_client = loader::connect(&pg_url).await?;
            let written = loader::load_metrics(&mut pg_client, &ticker, &rows).await?;
            println!("Loaded {} rows from {} into financial_metrics", written, csv_path.display());
        }
    }

    Ok(())
}
