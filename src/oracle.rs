//! Fiat price feed
//!
//! `PriceOracle` abstracts the external quote service; the HTTP
//! implementation targets a Binance-style ticker endpoint. The oracle
//! is stateless and never caches: retry semantics belong to the
//! watcher, which owns the backoff policy.

use crate::error::IngestError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Fiat price of the native currency at the time of query.
///
/// Valid for roughly one polling interval; records store the price
/// observed at enrichment time, not at block-confirmation time.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    /// Trading pair symbol, e.g. "ETHUSDT"
    pub pair: String,
    /// Positive fiat price
    pub price: f64,
}

/// Source of current fiat exchange rates.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Fetch the current price for a trading pair.
    ///
    /// Fails with `QuoteUnavailable` on network error, malformed
    /// response, or a non-positive price.
    async fn current_price(&self, pair: &str) -> Result<PriceQuote, IngestError>;
}

/// Ticker response shape shared by Binance-compatible endpoints.
#[derive(Debug, Deserialize)]
struct TickerResponse {
    price: String,
}

/// HTTP price oracle against a Binance-style ticker API.
pub struct HttpPriceOracle {
    client: reqwest::Client,
    base_url: String,
}

/// Default timeout applied to every quote request.
const QUOTE_TIMEOUT: Duration = Duration::from_secs(5);

impl HttpPriceOracle {
    /// Create an oracle for the given API base URL
    /// (e.g. "https://api.binance.com").
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(QUOTE_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client, base_url }
    }
}

#[async_trait]
impl PriceOracle for HttpPriceOracle {
    async fn current_price(&self, pair: &str) -> Result<PriceQuote, IngestError> {
        let url = format!(
            "{}/api/v3/ticker/price?symbol={}",
            self.base_url.trim_end_matches('/'),
            pair
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| IngestError::QuoteUnavailable(format!("{}: {}", pair, e)))?;

        let ticker: TickerResponse = response
            .json()
            .await
            .map_err(|e| IngestError::QuoteUnavailable(format!("{}: bad body: {}", pair, e)))?;

        parse_quote(pair, &ticker.price)
    }
}

/// Validate and parse a ticker price string into a quote.
fn parse_quote(pair: &str, raw: &str) -> Result<PriceQuote, IngestError> {
    let price: f64 = raw
        .parse()
        .map_err(|_| IngestError::QuoteUnavailable(format!("{}: bad price '{}'", pair, raw)))?;

    if !price.is_finite() || price <= 0.0 {
        return Err(IngestError::QuoteUnavailable(format!(
            "{}: non-positive price {}",
            pair, price
        )));
    }

    Ok(PriceQuote {
        pair: pair.to_string(),
        price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quote_accepts_positive_price() {
        let quote = parse_quote("ETHUSDT", "2000.50").unwrap();
        assert_eq!(quote.pair, "ETHUSDT");
        assert_eq!(quote.price, 2000.50);
    }

    #[test]
    fn test_parse_quote_rejects_bad_prices() {
        assert!(parse_quote("ETHUSDT", "0").is_err());
        assert!(parse_quote("ETHUSDT", "-12.5").is_err());
        assert!(parse_quote("ETHUSDT", "NaN").is_err());
        assert!(parse_quote("ETHUSDT", "not a number").is_err());
    }

    #[test]
    fn test_quote_failure_is_retryable() {
        let err = parse_quote("ETHUSDT", "0").unwrap_err();
        assert!(err.is_retryable());
    }
}
