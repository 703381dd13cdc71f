//! Transaction enrichment
//!
//! Pure fee computation: resolves the effective gas price for both
//! legacy and EIP-1559 transactions, converts the wei fee to native
//! units, and attaches the fiat price snapshot. Knows nothing about
//! persistence or which transactions are relevant.

use crate::error::IngestError;
use crate::oracle::PriceQuote;
use crate::records::FeeRecord;
use crate::types::{Block, Receipt, Transaction};
use alloy_primitives::U256;

/// Wei per native unit (18 decimals).
const WEI_PER_NATIVE: f64 = 1e18;

/// Build the persisted record for one matched transaction.
///
/// Invariants: `fee_native = gas_used * gas_price / 1e18` and
/// `fee_fiat = fee_native * quote.price`, where gas_price is the
/// effective price resolved from receipt, transaction, and block.
pub fn enrich(
    tx: &Transaction,
    receipt: &Receipt,
    block: &Block,
    quote: &PriceQuote,
) -> Result<FeeRecord, IngestError> {
    let gas_price = effective_gas_price(tx, receipt, block)?;
    let fee_wei = receipt.gas_used.saturating_mul(gas_price);
    let fee_native = wei_to_native(fee_wei)?;
    let fee_fiat = fee_native * quote.price;

    Ok(FeeRecord {
        hash: tx.hash,
        block_number: block.number,
        timestamp: block.timestamp,
        gas_used: receipt.gas_used,
        gas_price,
        fiat_price: quote.price,
        fee_native,
        fee_fiat,
    })
}

/// Resolve the effective gas price for a transaction.
///
/// Priority order:
/// 1. `effective_gas_price` from the receipt (post-London, most accurate)
/// 2. `gas_price` for legacy transactions
/// 3. EIP-1559: `min(max_fee, base_fee + max_priority_fee)`
pub fn effective_gas_price(
    tx: &Transaction,
    receipt: &Receipt,
    block: &Block,
) -> Result<U256, IngestError> {
    if let Some(egp) = receipt.effective_gas_price {
        return Ok(egp);
    }

    if tx.is_legacy() {
        return tx.gas_price.ok_or_else(|| {
            IngestError::InvalidInput(format!("{:?}: legacy tx missing gasPrice", tx.hash))
        });
    }

    if tx.is_eip1559() {
        let base_fee = block.base_fee_per_gas.ok_or_else(|| {
            IngestError::InvalidInput(format!(
                "{:?}: EIP-1559 tx but block {} has no baseFeePerGas",
                tx.hash, block.number
            ))
        })?;

        let max_fee = tx.max_fee_per_gas.ok_or_else(|| {
            IngestError::InvalidInput(format!("{:?}: EIP-1559 tx missing maxFeePerGas", tx.hash))
        })?;

        let max_priority_fee = tx.max_priority_fee_per_gas.unwrap_or(U256::ZERO);

        let calculated = base_fee.saturating_add(max_priority_fee);
        return Ok(calculated.min(max_fee));
    }

    Err(IngestError::InvalidInput(format!(
        "{:?}: fee undetermined (neither legacy nor EIP-1559)",
        tx.hash
    )))
}

/// Convert a wei amount to native units as f64.
///
/// Any realistic fee fits in u128; amounts that do not are rejected
/// rather than silently truncated.
fn wei_to_native(wei: U256) -> Result<f64, IngestError> {
    let wei: u128 = wei
        .try_into()
        .map_err(|_| IngestError::InvalidInput(format!("fee {} wei overflows u128", wei)))?;
    Ok(wei as f64 / WEI_PER_NATIVE)
}
