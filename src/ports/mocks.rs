//! In-memory port implementations for tests
//!
//! Scripted responses plus recorded calls, so monitor and engine tests can
//! run without a network.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::execution::{ExecutionError, ExecutionPort, ExecutionReceipt};
use super::market_data::{MarketDataError, MarketDataPort, TokenQuote};
use super::transaction_source::{
    RawTransaction, SignatureInfo, SourceError, TransactionSource,
};
use crate::domain::{DecisionAction, TradeDecision};

/// Transaction source backed by scripted fixtures
#[derive(Debug, Default)]
pub struct MockTransactionSource {
    signatures: Mutex<HashMap<String, Vec<SignatureInfo>>>,
    transactions: Mutex<HashMap<String, RawTransaction>>,
    fail_signatures: Mutex<bool>,
    signature_calls: Mutex<Vec<String>>,
    fetch_calls: Mutex<Vec<String>>,
}

impl MockTransactionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_signature(&self, address: &str, signature: &str, slot: u64) {
        let mut map = self.signatures.lock().unwrap();
        let list = map.entry(address.to_string()).or_default();
        // Source returns newest first
        list.insert(
            0,
            SignatureInfo {
                signature: signature.to_string(),
                slot,
            },
        );
    }

    pub fn insert_transaction(&self, tx: RawTransaction) {
        self.transactions
            .lock()
            .unwrap()
            .insert(tx.signature.clone(), tx);
    }

    /// Make subsequent `recent_signatures` calls fail until cleared
    pub fn set_failing(&self, failing: bool) {
        *self.fail_signatures.lock().unwrap() = failing;
    }

    pub fn signature_call_count(&self) -> usize {
        self.signature_calls.lock().unwrap().len()
    }

    pub fn fetch_calls(&self) -> Vec<String> {
        self.fetch_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransactionSource for MockTransactionSource {
    async fn recent_signatures(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, SourceError> {
        self.signature_calls
            .lock()
            .unwrap()
            .push(address.to_string());
        if *self.fail_signatures.lock().unwrap() {
            return Err(SourceError::Rpc("scripted failure".to_string()));
        }
        let map = self.signatures.lock().unwrap();
        Ok(map
            .get(address)
            .map(|list| list.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn fetch_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<RawTransaction>, SourceError> {
        self.fetch_calls
            .lock()
            .unwrap()
            .push(signature.to_string());
        Ok(self.transactions.lock().unwrap().get(signature).cloned())
    }
}

/// Market data backed by scripted quotes
#[derive(Debug, Default)]
pub struct MockMarketData {
    quotes: Mutex<HashMap<String, TokenQuote>>,
    failing: Mutex<bool>,
    quote_calls: Mutex<Vec<String>>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the quote returned for a token until replaced
    pub fn set_quote(&self, token_address: &str, price: f64, volume: Option<f64>) {
        self.quotes
            .lock()
            .unwrap()
            .insert(token_address.to_string(), TokenQuote { price, volume });
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn quote_calls(&self) -> Vec<String> {
        self.quote_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketDataPort for MockMarketData {
    async fn quote(&self, token_address: &str) -> Result<TokenQuote, MarketDataError> {
        self.quote_calls
            .lock()
            .unwrap()
            .push(token_address.to_string());
        if *self.failing.lock().unwrap() {
            return Err(MarketDataError::Request("scripted failure".to_string()));
        }
        self.quotes
            .lock()
            .unwrap()
            .get(token_address)
            .cloned()
            .ok_or_else(|| MarketDataError::NoQuote(token_address.to_string()))
    }
}

/// Execution port that fills every decision at a scripted price
#[derive(Debug)]
pub struct MockExecution {
    fill_price: Mutex<f64>,
    executed: Arc<Mutex<Vec<TradeDecision>>>,
    fail_next: Mutex<bool>,
}

impl Default for MockExecution {
    fn default() -> Self {
        Self {
            fill_price: Mutex::new(1.0),
            executed: Arc::new(Mutex::new(Vec::new())),
            fail_next: Mutex::new(false),
        }
    }
}

impl MockExecution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fill_price(self, price: f64) -> Self {
        *self.fill_price.lock().unwrap() = price;
        self
    }

    pub fn fail_next(&self) {
        *self.fail_next.lock().unwrap() = true;
    }

    pub fn executed(&self) -> Vec<TradeDecision> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutionPort for MockExecution {
    async fn execute(&self, decision: &TradeDecision) -> Result<ExecutionReceipt, ExecutionError> {
        if std::mem::take(&mut *self.fail_next.lock().unwrap()) {
            return Err(ExecutionError::Failed("scripted failure".to_string()));
        }
        self.executed.lock().unwrap().push(decision.clone());
        let price = *self.fill_price.lock().unwrap();
        // Entries are sized in SOL lamports, exits in token units
        let filled_quantity = match decision.action {
            DecisionAction::Enter => decision.size / 1e9 / price,
            DecisionAction::Exit => decision.size,
        };
        Ok(ExecutionReceipt {
            signature: format!("mock-fill-{}", decision.token_address),
            filled_quantity,
            fill_price: price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DecisionAction;

    #[tokio::test]
    async fn test_mock_source_returns_newest_first() {
        let source = MockTransactionSource::new();
        source.push_signature("wallet1", "sig1", 100);
        source.push_signature("wallet1", "sig2", 101);

        let sigs = source.recent_signatures("wallet1", 10).await.unwrap();
        assert_eq!(sigs[0].signature, "sig2");
        assert_eq!(sigs[1].signature, "sig1");
        assert_eq!(source.signature_call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_source_limit_and_failure() {
        let source = MockTransactionSource::new();
        for i in 0..5 {
            source.push_signature("wallet1", &format!("sig{}", i), i);
        }
        let sigs = source.recent_signatures("wallet1", 2).await.unwrap();
        assert_eq!(sigs.len(), 2);

        source.set_failing(true);
        assert!(source.recent_signatures("wallet1", 2).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_execution_records_decisions() {
        let execution = MockExecution::new().with_fill_price(2.0);
        let decision = TradeDecision {
            action: DecisionAction::Enter,
            token_address: "mint1".to_string(),
            size: 2_000_000_000.0,
            triggering_rule: "copy-entry".to_string(),
        };

        let receipt = execution.execute(&decision).await.unwrap();
        assert_eq!(receipt.fill_price, 2.0);
        assert_eq!(execution.executed().len(), 1);

        execution.fail_next();
        assert!(execution.execute(&decision).await.is_err());
    }
}
