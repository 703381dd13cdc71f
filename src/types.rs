//! Ethereum JSON-RPC wire types
//!
//! Blocks, transactions, and receipts as returned by an Ethereum
//! JSON-RPC endpoint. All numeric fields arrive as hex strings.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Deserializer};

/// Ethereum block with full transaction details.
#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    /// Block number (hex string in JSON, parsed to u64)
    #[serde(rename = "number", deserialize_with = "deserialize_hex_u64")]
    pub number: u64,

    /// Block hash (hex string in JSON)
    #[serde(rename = "hash", deserialize_with = "deserialize_hex_b256")]
    pub hash: B256,

    /// Block timestamp (Unix epoch seconds, hex string in JSON)
    #[serde(rename = "timestamp", deserialize_with = "deserialize_hex_u64")]
    pub timestamp: u64,

    /// Base fee per gas (EIP-1559, hex string in JSON)
    #[serde(
        rename = "baseFeePerGas",
        default,
        deserialize_with = "deserialize_hex_u256_opt"
    )]
    pub base_fee_per_gas: Option<U256>,

    /// List of transactions in the block
    #[serde(rename = "transactions")]
    pub transactions: Vec<Transaction>,
}

/// Ethereum transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    /// Transaction hash (hex string in JSON)
    #[serde(rename = "hash", deserialize_with = "deserialize_hex_b256")]
    pub hash: B256,

    /// Sender address (hex string in JSON)
    #[serde(rename = "from", deserialize_with = "deserialize_hex_address")]
    pub from: Address,

    /// Recipient address (None for contract creation, hex string in JSON)
    #[serde(rename = "to", deserialize_with = "deserialize_hex_address_opt")]
    pub to: Option<Address>,

    /// Value transferred in wei (hex string in JSON)
    #[serde(rename = "value", deserialize_with = "deserialize_hex_u256")]
    pub value: U256,

    /// Gas price (legacy transactions, hex string in JSON)
    #[serde(
        rename = "gasPrice",
        default,
        deserialize_with = "deserialize_hex_u256_opt"
    )]
    pub gas_price: Option<U256>,

    /// Max fee per gas (EIP-1559, hex string in JSON)
    #[serde(
        rename = "maxFeePerGas",
        default,
        deserialize_with = "deserialize_hex_u256_opt"
    )]
    pub max_fee_per_gas: Option<U256>,

    /// Max priority fee per gas (EIP-1559, hex string in JSON)
    #[serde(
        rename = "maxPriorityFeePerGas",
        default,
        deserialize_with = "deserialize_hex_u256_opt"
    )]
    pub max_priority_fee_per_gas: Option<U256>,
}

impl Transaction {
    /// Check if this is a legacy transaction (has gasPrice, no maxFeePerGas).
    pub fn is_legacy(&self) -> bool {
        self.gas_price.is_some() && self.max_fee_per_gas.is_none()
    }

    /// Check if this is an EIP-1559 transaction (has maxFeePerGas).
    pub fn is_eip1559(&self) -> bool {
        self.max_fee_per_gas.is_some()
    }

    /// Check whether this transaction is addressed to `addr`.
    ///
    /// Addresses are compared as parsed 20-byte values, so hex casing
    /// in the wire encoding never matters.
    pub fn is_to(&self, addr: Address) -> bool {
        self.to == Some(addr)
    }
}

/// Transaction receipt.
#[derive(Debug, Clone, Deserialize)]
pub struct Receipt {
    /// Transaction status: 1 = success, 0 = failure (hex string in JSON)
    #[serde(rename = "status", deserialize_with = "deserialize_hex_u64")]
    pub status: u64,

    /// Gas used (hex string in JSON)
    #[serde(rename = "gasUsed", deserialize_with = "deserialize_hex_u256")]
    pub gas_used: U256,

    /// Effective gas price (post-London, hex string in JSON)
    #[serde(
        rename = "effectiveGasPrice",
        default,
        deserialize_with = "deserialize_hex_u256_opt"
    )]
    pub effective_gas_price: Option<U256>,
}

// Hex deserialization helpers

/// Pad an odd-length hex string with a leading zero.
/// Handles RPC responses that strip leading zeros.
fn pad_hex_string(s: &str) -> String {
    if s.len() % 2 == 1 {
        format!("0{}", s)
    } else {
        s.to_string()
    }
}

/// Deserialize a hex string to u64.
fn deserialize_hex_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let s = s.strip_prefix("0x").unwrap_or(&s);
    u64::from_str_radix(s, 16).map_err(serde::de::Error::custom)
}

/// Deserialize a hex string to U256.
fn deserialize_hex_u256<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let s = s.strip_prefix("0x").unwrap_or(&s);
    if s.is_empty() {
        return Ok(U256::ZERO);
    }
    let s = pad_hex_string(s);
    let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
    Ok(U256::from_be_slice(&bytes))
}

/// Deserialize an optional hex string to U256.
fn deserialize_hex_u256_opt<'de, D>(deserializer: D) -> Result<Option<U256>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    match s {
        Some(s) => {
            let s = s.strip_prefix("0x").unwrap_or(&s);
            if s.is_empty() {
                Ok(Some(U256::ZERO))
            } else {
                let s = pad_hex_string(s);
                let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
                Ok(Some(U256::from_be_slice(&bytes)))
            }
        }
        None => Ok(None),
    }
}

/// Deserialize a hex string to B256.
fn deserialize_hex_b256<'de, D>(deserializer: D) -> Result<B256, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let s = s.strip_prefix("0x").unwrap_or(&s);
    let s = pad_hex_string(s);
    let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
    if bytes.len() != 32 {
        return Err(serde::de::Error::custom(format!(
            "Expected 32 bytes for hash, got {}",
            bytes.len()
        )));
    }
    Ok(B256::from_slice(&bytes))
}

/// Deserialize a hex string to Address.
fn deserialize_hex_address<'de, D>(deserializer: D) -> Result<Address, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let s = s.strip_prefix("0x").unwrap_or(&s);
    let s = pad_hex_string(s);
    let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
    if bytes.len() != 20 {
        return Err(serde::de::Error::custom(format!(
            "Expected 20 bytes for address, got {}",
            bytes.len()
        )));
    }
    Ok(Address::from_slice(&bytes))
}

/// Deserialize an optional hex string to Address.
fn deserialize_hex_address_opt<'de, D>(deserializer: D) -> Result<Option<Address>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    match s {
        Some(s) => {
            let s = s.strip_prefix("0x").unwrap_or(&s);
            if s.is_empty() {
                Ok(None)
            } else {
                let s = pad_hex_string(s);
                let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
                if bytes.len() != 20 {
                    return Err(serde::de::Error::custom(format!(
                        "Expected 20 bytes for address, got {}",
                        bytes.len()
                    )));
                }
                Ok(Some(Address::from_slice(&bytes)))
            }
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_block_deserialization() {
        let json = serde_json::json!({
            "number": "0x64",
            "hash": "0x00000000000000000000000000000000000000000000000000000000000000aa",
            "timestamp": "0x65f0c800",
            "baseFeePerGas": "0x3b9aca00",
            "transactions": [{
                "hash": "0x00000000000000000000000000000000000000000000000000000000000000bb",
                "from": "0x0742d35cc6634c0532925a3b844bc9e7595f0beb",
                "to": "0xdac17f958d2ee523a2206206994597c13d831ec7",
                "value": "0x0",
                "gasPrice": "0xba43b7400"
            }]
        });

        let block: Block = serde_json::from_value(json).unwrap();
        assert_eq!(block.number, 100);
        assert_eq!(block.timestamp, 0x65f0c800);
        assert_eq!(block.transactions.len(), 1);
        let tx = &block.transactions[0];
        assert!(tx.is_legacy());
        assert!(tx.is_to(address!("dac17f958d2ee523a2206206994597c13d831ec7")));
    }

    #[test]
    fn test_address_filter_ignores_hex_casing() {
        let lower = serde_json::json!({
            "hash": "0x00000000000000000000000000000000000000000000000000000000000000bb",
            "from": "0x0742d35cc6634c0532925a3b844bc9e7595f0beb",
            "to": "0xdac17f958d2ee523a2206206994597c13d831ec7",
            "value": "0x0",
            "gasPrice": "0x1"
        });
        let checksummed = serde_json::json!({
            "hash": "0x00000000000000000000000000000000000000000000000000000000000000bb",
            "from": "0x0742d35cc6634c0532925a3b844bc9e7595f0beb",
            "to": "0xdAC17F958D2ee523a2206206994597C13D831ec7",
            "value": "0x0",
            "gasPrice": "0x1"
        });

        let a: Transaction = serde_json::from_value(lower).unwrap();
        let b: Transaction = serde_json::from_value(checksummed).unwrap();
        let pool = address!("dac17f958d2ee523a2206206994597c13d831ec7");
        assert!(a.is_to(pool));
        assert!(b.is_to(pool));
    }

    #[test]
    fn test_receipt_deserialization() {
        let json = serde_json::json!({
            "status": "0x1",
            "gasUsed": "0x5208",
            "effectiveGasPrice": "0xba43b7400"
        });

        let receipt: Receipt = serde_json::from_value(json).unwrap();
        assert_eq!(receipt.status, 1);
        assert_eq!(receipt.gas_used, U256::from(21000u64));
        assert_eq!(
            receipt.effective_gas_price,
            Some(U256::from(50_000_000_000u64))
        );
    }

    #[test]
    fn test_contract_creation_has_no_destination() {
        let json = serde_json::json!({
            "hash": "0x00000000000000000000000000000000000000000000000000000000000000cc",
            "from": "0x0742d35cc6634c0532925a3b844bc9e7595f0beb",
            "to": null,
            "value": "0x0",
            "maxFeePerGas": "0x77359400",
            "maxPriorityFeePerGas": "0x3b9aca00"
        });

        let tx: Transaction = serde_json::from_value(json).unwrap();
        assert!(tx.to.is_none());
        assert!(tx.is_eip1559());
        assert!(!tx.is_to(address!("dac17f958d2ee523a2206206994597c13d831ec7")));
    }
}
