//! Paper Execution Adapter
//!
//! Simulated fills for dry runs. Every decision fills instantly at the
//! last observed price, with a synthetic signature, so the whole pipeline
//! including position bookkeeping runs without touching a wallet.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::domain::event::{DecisionAction, TradeDecision};
use crate::ports::{ExecutionError, ExecutionPort, ExecutionReceipt};

const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Fill price used before any price update was seen for a token
const DEFAULT_FILL_PRICE: f64 = 0.000_000_05;

pub struct PaperExecutor {
    fill_counter: AtomicU64,
    /// Last price per token, fed from the dispatcher's price-update topic
    last_price: Mutex<std::collections::HashMap<String, f64>>,
}

impl Default for PaperExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl PaperExecutor {
    pub fn new() -> Self {
        Self {
            fill_counter: AtomicU64::new(0),
            last_price: Mutex::new(std::collections::HashMap::new()),
        }
    }

    /// Record the latest observed price so simulated fills track the market
    pub fn update_price(&self, token_address: &str, price: f64) {
        if price > 0.0 {
            self.last_price
                .lock()
                .unwrap()
                .insert(token_address.to_string(), price);
        }
    }

    pub fn fills(&self) -> u64 {
        self.fill_counter.load(Ordering::Relaxed)
    }

    fn price_for(&self, token_address: &str) -> f64 {
        self.last_price
            .lock()
            .unwrap()
            .get(token_address)
            .copied()
            .unwrap_or(DEFAULT_FILL_PRICE)
    }
}

#[async_trait]
impl ExecutionPort for PaperExecutor {
    async fn execute(&self, decision: &TradeDecision) -> Result<ExecutionReceipt, ExecutionError> {
        if decision.size <= 0.0 {
            return Err(ExecutionError::Rejected("zero-size decision".to_string()));
        }

        let fill_price = self.price_for(&decision.token_address);
        let filled_quantity = match decision.action {
            // Entries are sized in SOL lamports; convert at the fill price
            DecisionAction::Enter => decision.size / LAMPORTS_PER_SOL / fill_price,
            // Exits are sized in token units already
            DecisionAction::Exit => decision.size,
        };

        let n = self.fill_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let signature = format!("paper-fill-{n}");

        info!(
            action = ?decision.action,
            token = %decision.token_address,
            rule = %decision.triggering_rule,
            quantity = filled_quantity,
            price = fill_price,
            signature = %signature,
            "paper fill"
        );

        Ok(ExecutionReceipt {
            signature,
            filled_quantity,
            fill_price,
        })
    }
}
