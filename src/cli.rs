//! CLI implementation for poolctl
//!
//! Developer-friendly read access to the fee ledger. All commands
//! output pretty JSON. These are pure reads; the ingestion daemon is
//! the only writer.

use crate::config::parse_tx_hash;
use crate::records::{FeeRecord, RecordFilter};
use crate::store::{Ledger, RocksLedger};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;

/// Fee ledger CLI tool
#[derive(Parser)]
#[command(name = "poolctl")]
#[command(about = "Query the pool fee ledger")]
pub struct Cli {
    /// Path to the RocksDB ledger directory
    #[arg(short, long, default_value = "./ledger_db")]
    db_path: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the ingestion cursor (highest fully processed block)
    Cursor,
    /// Look up a single record by transaction hash
    Get {
        /// Transaction hash (hex, with or without 0x prefix)
        hash: String,
    },
    /// List records newest-first, filtered by timestamp range
    List {
        /// Inclusive lower timestamp bound (Unix epoch seconds)
        #[arg(long)]
        from_ts: Option<u64>,
        /// Inclusive upper timestamp bound (Unix epoch seconds)
        #[arg(long)]
        to_ts: Option<u64>,
        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Records per page (max 100)
        #[arg(long, default_value_t = 50)]
        page_size: usize,
    },
    /// Show aggregate fee totals and the latest fiat price
    Stats,
    /// List transactions that exhausted their enrichment retries
    DeadLetters,
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let ledger = RocksLedger::open(&cli.db_path)
        .with_context(|| format!("Failed to open ledger at {:?}", cli.db_path))?;

    match cli.command {
        Commands::Cursor => {
            let cursor = ledger.get_cursor()?;
            print_json(&json!({ "cursor": cursor }));
        }
        Commands::Get { hash } => {
            let hash = parse_tx_hash(&hash).context("Invalid transaction hash")?;
            match ledger.get_by_hash(hash)? {
                Some(record) => print_json(&record_to_json(&record)),
                None => {
                    print_json(&json!({ "error": "not found" }));
                    std::process::exit(1);
                }
            }
        }
        Commands::List {
            from_ts,
            to_ts,
            page,
            page_size,
        } => {
            let filter = RecordFilter {
                from_timestamp: from_ts,
                to_timestamp: to_ts,
                page,
                page_size,
            };
            let records = ledger.list(&filter)?;
            let rows: Vec<_> = records.iter().map(record_to_json).collect();
            print_json(&json!({
                "page": filter.page,
                "page_size": filter.effective_page_size(),
                "records": rows,
            }));
        }
        Commands::Stats => {
            let totals = ledger.totals()?;
            print_json(&json!({
                "record_count": totals.record_count,
                "total_fee_native": totals.total_fee_native,
                "total_fee_fiat": totals.total_fee_fiat,
                "latest_fiat_price": totals.latest_fiat_price,
            }));
        }
        Commands::DeadLetters => {
            let dead = ledger.list_dead_letters()?;
            let rows: Vec<_> = dead
                .iter()
                .map(|dl| {
                    json!({
                        "hash": format!("{:?}", dl.hash),
                        "block_number": dl.block_number,
                        "attempts": dl.attempts,
                        "reason": dl.reason,
                    })
                })
                .collect();
            print_json(&json!({ "dead_letters": rows }));
        }
    }

    Ok(())
}

fn record_to_json(record: &FeeRecord) -> serde_json::Value {
    json!({
        "hash": format!("{:?}", record.hash),
        "block_number": record.block_number,
        "timestamp": record.timestamp,
        "gas_used": record.gas_used.to_string(),
        "gas_price": record.gas_price.to_string(),
        "fiat_price": record.fiat_price,
        "fee_native": record.fee_native,
        "fee_fiat": record.fee_fiat,
    })
}

fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}
