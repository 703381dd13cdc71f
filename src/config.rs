//! Ingestion configuration
//!
//! Pool address parsing plus the polling, backoff, and retry knobs
//! consumed by the watcher loop.

use alloy_primitives::Address;
use anyhow::{Context, Result};
use std::time::Duration;

/// Configuration for the ingestion loop.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Liquidity pool address whose inbound transactions are tracked
    pub pool_address: Address,
    /// Trading pair symbol passed to the price oracle (e.g. "ETHUSDT")
    pub pair: String,
    /// Sleep between polls when no new blocks are available
    pub poll_interval: Duration,
    /// Sleep after a retryable failure before polling again
    pub error_backoff: Duration,
    /// Enrichment attempts per transaction before dead-lettering
    pub quote_attempts: u32,
    /// Sleep between enrichment attempts for the same transaction
    pub quote_retry_delay: Duration,
    /// Block to start from when the ledger is empty (None = node latest)
    pub start_block: Option<u64>,
}

impl IngestConfig {
    /// Build a config with default timing for the given pool and pair.
    pub fn new(pool_address: Address, pair: impl Into<String>) -> Self {
        Self {
            pool_address,
            pair: pair.into(),
            poll_interval: Duration::from_secs(1),
            error_backoff: Duration::from_secs(5),
            quote_attempts: 3,
            quote_retry_delay: Duration::from_millis(500),
            start_block: None,
        }
    }
}

/// Pad an odd-length hex string with a leading zero.
fn pad_hex_string(s: &str) -> String {
    if s.len() % 2 == 1 {
        format!("0{}", s)
    } else {
        s.to_string()
    }
}

/// Parse an address from a hex string.
///
/// Accepts addresses with or without 0x prefix, in any casing.
pub fn parse_address(s: &str) -> Result<Address> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    let s = pad_hex_string(s);
    let bytes = hex::decode(&s).with_context(|| format!("Invalid hex address: {}", s))?;

    if bytes.len() != 20 {
        anyhow::bail!(
            "Address must be 20 bytes (40 hex chars), got {} bytes",
            bytes.len()
        );
    }

    Ok(Address::from_slice(&bytes))
}

/// Parse a 32-byte transaction hash from a hex string.
pub fn parse_tx_hash(s: &str) -> Result<alloy_primitives::B256> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    let s = pad_hex_string(s);
    let bytes = hex::decode(&s).with_context(|| format!("Invalid hex hash: {}", s))?;

    if bytes.len() != 32 {
        anyhow::bail!(
            "Transaction hash must be 32 bytes (64 hex chars), got {} bytes",
            bytes.len()
        );
    }

    Ok(alloy_primitives::B256::from_slice(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        let addr1 = parse_address("0xdAC17F958D2ee523a2206206994597C13D831ec7").unwrap();
        let addr2 = parse_address("dac17f958d2ee523a2206206994597c13d831ec7").unwrap();
        assert_eq!(addr1, addr2);
    }

    #[test]
    fn test_parse_address_rejects_wrong_length() {
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("not hex at all").is_err());
    }

    #[test]
    fn test_parse_tx_hash() {
        let h = parse_tx_hash(
            "0x00000000000000000000000000000000000000000000000000000000000000aa",
        )
        .unwrap();
        assert_eq!(h.as_slice()[31], 0xaa);
        assert!(parse_tx_hash("0xabcd").is_err());
    }

    #[test]
    fn test_default_config_timing() {
        let pool = parse_address("dac17f958d2ee523a2206206994597c13d831ec7").unwrap();
        let config = IngestConfig::new(pool, "ETHUSDT");
        assert!(config.error_backoff > config.poll_interval);
        assert_eq!(config.quote_attempts, 3);
        assert!(config.start_block.is_none());
    }
}
