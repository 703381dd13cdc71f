//! Record types persisted in the fee ledger
//!
//! These structs are the on-disk schema. They use postcard for binary
//! serialization, which is compact and deterministic.

use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};

/// One enriched pool transaction, keyed uniquely by hash.
///
/// Records are append-only: written once by the ingestion loop and
/// never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeRecord {
    /// Transaction hash (primary key)
    pub hash: B256,
    /// Block containing the transaction
    pub block_number: u64,
    /// Block timestamp (Unix epoch seconds)
    pub timestamp: u64,
    /// Gas consumed, from the receipt
    pub gas_used: U256,
    /// Effective gas price paid, in wei
    pub gas_price: U256,
    /// Fiat price of the native currency observed at enrichment time
    pub fiat_price: f64,
    /// Fee in native currency: gas_used * gas_price / 1e18
    pub fee_native: f64,
    /// Fee in fiat: fee_native * fiat_price
    pub fee_fiat: f64,
}

/// A matched transaction that exhausted its enrichment retries.
///
/// Dead letters never block the cursor; they exist so permanently
/// failing hashes stay visible instead of being silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetter {
    /// Transaction hash
    pub hash: B256,
    /// Block containing the transaction
    pub block_number: u64,
    /// Number of enrichment attempts made before giving up
    pub attempts: u32,
    /// Last error observed, as display text
    pub reason: String,
}

/// Aggregate totals over all persisted fee records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerTotals {
    /// Number of records in the ledger
    pub record_count: u64,
    /// Sum of fee_native across all records
    pub total_fee_native: f64,
    /// Sum of fee_fiat across all records
    pub total_fee_fiat: f64,
    /// Fiat price on the most recently timestamped record
    pub latest_fiat_price: Option<f64>,
}

/// Filter and pagination parameters for ledger listings.
///
/// Results are ordered newest-first by block timestamp.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    /// Inclusive lower timestamp bound
    pub from_timestamp: Option<u64>,
    /// Inclusive upper timestamp bound
    pub to_timestamp: Option<u64>,
    /// 1-based page number
    pub page: usize,
    /// Records per page, capped at MAX_PAGE_SIZE
    pub page_size: usize,
}

/// Hard cap on page size for ledger listings.
pub const MAX_PAGE_SIZE: usize = 100;

impl Default for RecordFilter {
    fn default() -> Self {
        Self {
            from_timestamp: None,
            to_timestamp: None,
            page: 1,
            page_size: 50,
        }
    }
}

impl RecordFilter {
    /// Effective page size after clamping to the cap.
    pub fn effective_page_size(&self) -> usize {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Number of records to skip before the requested page.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1) * self.effective_page_size()
    }

    /// Whether a timestamp falls inside the configured bounds.
    pub fn matches_timestamp(&self, ts: u64) -> bool {
        if let Some(from) = self.from_timestamp {
            if ts < from {
                return false;
            }
        }
        if let Some(to) = self.to_timestamp {
            if ts > to {
                return false;
            }
        }
        true
    }
}
