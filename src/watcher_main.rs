//! Pool fee ingestion daemon
//!
//! Polls an Ethereum node for new blocks, records the fee of every
//! transaction sent to the configured pool address, and converts it
//! to fiat using an external price feed.

use anyhow::{Context, Result};
use clap::Parser;
use poolwatch::config::{parse_address, IngestConfig};
use poolwatch::oracle::HttpPriceOracle;
use poolwatch::rpc::HttpChainReader;
use poolwatch::store::RocksLedger;
use poolwatch::watcher::Watcher;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Pool fee tracker
#[derive(Parser)]
#[command(name = "poolwatch")]
#[command(about = "Track fees of transactions sent to a liquidity pool address")]
struct Args {
    /// RPC endpoint URL (e.g. https://eth.llamarpc.com)
    #[arg(short, long, default_value = "http://127.0.0.1:8545")]
    rpc_url: String,

    /// Pool address to watch (hex, with or without 0x prefix)
    #[arg(short, long)]
    pool: String,

    /// Price feed API base URL
    #[arg(long, default_value = "https://api.binance.com")]
    price_url: String,

    /// Trading pair symbol for the fiat conversion
    #[arg(long, default_value = "ETHUSDT")]
    pair: String,

    /// Path to the RocksDB ledger directory
    #[arg(short, long, default_value = "./ledger_db")]
    db_path: PathBuf,

    /// Block to start from when the ledger is empty (default: node latest)
    #[arg(long)]
    start_block: Option<u64>,

    /// Seconds between polls when no new blocks are available
    #[arg(long, default_value_t = 1)]
    poll_interval: u64,

    /// Seconds to back off after a retryable failure
    #[arg(long, default_value_t = 5)]
    error_backoff: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let pool = parse_address(&args.pool).context("Invalid pool address")?;

    info!("Starting pool fee tracker");
    info!("RPC URL: {}", args.rpc_url);
    info!("Pool: {}", pool);
    info!("Pair: {}", args.pair);
    info!("Database: {:?}", args.db_path);

    let mut config = IngestConfig::new(pool, args.pair);
    config.poll_interval = Duration::from_secs(args.poll_interval);
    config.error_backoff = Duration::from_secs(args.error_backoff);
    config.start_block = args.start_block;

    let chain = HttpChainReader::new(args.rpc_url);
    let oracle = HttpPriceOracle::new(args.price_url);
    let ledger = RocksLedger::open(&args.db_path)
        .with_context(|| format!("Failed to open ledger at {:?}", args.db_path))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut watcher = Watcher::new(chain, oracle, ledger, config, shutdown_rx);
    watcher.initialize().await.context("Failed to initialize watcher")?;

    // Signal shutdown through the watch channel so in-flight work
    // finishes at a clean per-transaction boundary instead of being
    // cancelled mid-write.
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully...");
            let _ = shutdown_tx.send(true);
        }
    });

    watcher.run().await.context("Watcher error")?;

    info!("Watcher stopped");
    Ok(())
}
