//! Chain read access
//!
//! The `ChainReader` trait abstracts the Ethereum node so the watcher
//! can run against fakes in tests; `HttpChainReader` is the JSON-RPC
//! implementation. No retry logic lives here: failures surface as
//! typed errors for the orchestrator to interpret.

use crate::error::IngestError;
use crate::types::{Block, Receipt};
use alloy_primitives::B256;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// Read access to a blockchain node.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Highest block number known to the node.
    async fn latest_height(&self) -> Result<u64, IngestError>;

    /// Fetch a block with full transaction objects.
    ///
    /// Fails with `NotFound` if the height exceeds the node's latest.
    async fn get_block(&self, height: u64) -> Result<Block, IngestError>;

    /// Fetch the receipt for a transaction.
    async fn get_receipt(&self, tx_hash: B256) -> Result<Receipt, IngestError>;
}

/// JSON-RPC client for Ethereum nodes.
pub struct HttpChainReader {
    client: reqwest::Client,
    url: String,
}

/// Default timeout applied to every RPC request.
const RPC_TIMEOUT: Duration = Duration::from_secs(10);

impl HttpChainReader {
    /// Create a new RPC client with the default request timeout.
    pub fn new(url: String) -> Self {
        Self::with_timeout(url, RPC_TIMEOUT)
    }

    /// Create a new RPC client with an explicit request timeout.
    pub fn with_timeout(url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client, url }
    }

    /// Make a JSON-RPC call.
    ///
    /// Returns the raw `result` value; `Value::Null` is passed through
    /// so callers can map it to `NotFound` per method.
    async fn call(&self, method: &str, params: Value) -> Result<Value, IngestError> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| IngestError::NodeUnavailable(format!("{}: {}", method, e)))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| IngestError::NodeUnavailable(format!("{}: bad body: {}", method, e)))?;

        if let Some(error) = body.get("error") {
            return Err(IngestError::NodeUnavailable(format!(
                "{}: rpc error: {}",
                method, error
            )));
        }

        body.get("result")
            .cloned()
            .ok_or_else(|| IngestError::NodeUnavailable(format!("{}: missing result", method)))
    }
}

#[async_trait]
impl ChainReader for HttpChainReader {
    async fn latest_height(&self) -> Result<u64, IngestError> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        let s = result
            .as_str()
            .ok_or_else(|| IngestError::NodeUnavailable("eth_blockNumber: not a string".into()))?;
        parse_hex_u64(s)
            .ok_or_else(|| IngestError::NodeUnavailable(format!("bad block number: {}", s)))
    }

    async fn get_block(&self, height: u64) -> Result<Block, IngestError> {
        let params = json!([format!("0x{:x}", height), true]);
        let result = self.call("eth_getBlockByNumber", params).await?;

        if result.is_null() {
            return Err(IngestError::NotFound(format!("block {}", height)));
        }

        serde_json::from_value(result)
            .map_err(|e| IngestError::NodeUnavailable(format!("bad block {}: {}", height, e)))
    }

    async fn get_receipt(&self, tx_hash: B256) -> Result<Receipt, IngestError> {
        let params = json!([format!("0x{:x}", tx_hash)]);
        let result = self.call("eth_getTransactionReceipt", params).await?;

        if result.is_null() {
            return Err(IngestError::NotFound(format!("receipt {:?}", tx_hash)));
        }

        serde_json::from_value(result)
            .map_err(|e| IngestError::NodeUnavailable(format!("bad receipt {:?}: {}", tx_hash, e)))
    }
}

/// Parse a 0x-prefixed hex quantity into a u64.
fn parse_hex_u64(s: &str) -> Option<u64> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() {
        return None;
    }
    u64::from_str_radix(s, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_u64() {
        assert_eq!(parse_hex_u64("0x0"), Some(0));
        assert_eq!(parse_hex_u64("0x64"), Some(100));
        assert_eq!(parse_hex_u64("ff"), Some(255));
        assert_eq!(parse_hex_u64("0x"), None);
        assert_eq!(parse_hex_u64("0xzz"), None);
    }
}
