//! Error taxonomy for the ingestion pipeline
//!
//! Callers use the variant to decide between retrying with backoff
//! (unavailable dependencies) and isolating a single transaction
//! (bad quote or bad input).

use thiserror::Error;

/// Errors surfaced by the ingestion components.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The Ethereum node could not be reached, timed out, or returned
    /// a malformed response.
    #[error("node unavailable: {0}")]
    NodeUnavailable(String),

    /// The requested block or receipt does not exist on the node.
    #[error("not found: {0}")]
    NotFound(String),

    /// The price feed could not be reached, returned a malformed body,
    /// or reported a non-positive price.
    #[error("quote unavailable: {0}")]
    QuoteUnavailable(String),

    /// Transaction or receipt data is unusable for fee computation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The ledger database is unreachable or rejected the operation.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl IngestError {
    /// Whether the failure is expected to clear on its own.
    ///
    /// Retryable errors are handled with backoff and never advance the
    /// cursor; the rest are isolated to the transaction that caused them.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IngestError::NodeUnavailable(_)
                | IngestError::QuoteUnavailable(_)
                | IngestError::StorageUnavailable(_)
        )
    }
}
