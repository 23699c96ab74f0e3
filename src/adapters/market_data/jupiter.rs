//! Jupiter Price API Adapter
//!
//! Quote lookups against the Jupiter price API v2. The response maps each
//! requested mint to a price entry (null for unknown mints) with the price
//! encoded as a decimal string. Jupiter does not report volume here, so
//! quotes come back without one and spike detection stays quiet for this
//! source.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::ports::market_data::{MarketDataError, MarketDataPort, TokenQuote};

/// Default base URL for the Jupiter price API
pub const DEFAULT_PRICE_API_URL: &str = "https://api.jup.ag/price/v2";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct JupiterPriceSource {
    http: Client,
    base_url: String,
}

impl JupiterPriceSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, MarketDataError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MarketDataError::Request(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    data: HashMap<String, Option<PriceEntry>>,
}

#[derive(Debug, Deserialize)]
struct PriceEntry {
    price: String,
}

#[async_trait]
impl MarketDataPort for JupiterPriceSource {
    async fn quote(&self, token_address: &str) -> Result<TokenQuote, MarketDataError> {
        let url = format!("{}?ids={}", self.base_url, token_address);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| MarketDataError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MarketDataError::Request(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let body: PriceResponse = response
            .json()
            .await
            .map_err(|e| MarketDataError::Malformed(e.to_string()))?;

        let entry = body
            .data
            .get(token_address)
            .and_then(|entry| entry.as_ref())
            .ok_or_else(|| MarketDataError::NoQuote(token_address.to_string()))?;

        let price: f64 = entry
            .price
            .parse()
            .map_err(|_| MarketDataError::Malformed(format!("price {:?}", entry.price)))?;

        debug!(token = token_address, price, "jupiter quote");
        Ok(TokenQuote {
            price,
            volume: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_response_parses() {
        let body = r#"{
            "data": {
                "So11111111111111111111111111111111111111112": {
                    "id": "So11111111111111111111111111111111111111112",
                    "type": "derivedPrice",
                    "price": "147.23"
                }
            },
            "timeTaken": 0.003
        }"#;
        let parsed: PriceResponse = serde_json::from_str(body).unwrap();
        let entry = parsed
            .data
            .get("So11111111111111111111111111111111111111112")
            .unwrap()
            .as_ref()
            .unwrap();
        assert_eq!(entry.price, "147.23");
    }

    #[test]
    fn test_unknown_mint_is_null() {
        let body = r#"{"data": {"BadMint1111111111111111111111111111111111111": null}}"#;
        let parsed: PriceResponse = serde_json::from_str(body).unwrap();
        assert!(parsed
            .data
            .get("BadMint1111111111111111111111111111111111111")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_source_builds_with_custom_url() {
        let source = JupiterPriceSource::new("http://localhost:9999/price").unwrap();
        assert_eq!(source.base_url, "http://localhost:9999/price");
    }
}
