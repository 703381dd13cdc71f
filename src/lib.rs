//! poolwatch - liquidity pool fee tracker
//!
//! Continuously ingests blocks from an Ethereum node, records the fee
//! of every transaction sent to a configured pool address in both
//! native currency and fiat, and persists the results idempotently in
//! a local RocksDB ledger.

pub mod cli;
pub mod config;
pub mod enrich;
pub mod error;
pub mod keys;
pub mod oracle;
pub mod records;
pub mod rpc;
pub mod store;
pub mod types;
pub mod watcher;

// Re-export the main types for convenience
pub use config::IngestConfig;
pub use error::IngestError;
pub use oracle::{HttpPriceOracle, PriceOracle, PriceQuote};
pub use records::{DeadLetter, FeeRecord, LedgerTotals, RecordFilter};
pub use rpc::{ChainReader, HttpChainReader};
pub use store::{Ledger, RocksLedger};
pub use watcher::{IngestStats, Watcher};
