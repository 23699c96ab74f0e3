//! Market data port
//!
//! Quote lookups for tokens the engine holds. The price tracker polls this
//! seam and turns raw quotes into the price/volume signals the exit rules
//! consume.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("Market data request failed: {0}")]
    Request(String),
    #[error("Malformed market data response: {0}")]
    Malformed(String),
    #[error("No quote available for token {0}")]
    NoQuote(String),
}

/// Latest market snapshot for one token
#[derive(Debug, Clone, PartialEq)]
pub struct TokenQuote {
    /// Price in SOL per token
    pub price: f64,
    /// Recent traded volume, when the venue reports one
    pub volume: Option<f64>,
}

#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// Fetch the current quote for a token mint
    async fn quote(&self, token_address: &str) -> Result<TokenQuote, MarketDataError>;
}
