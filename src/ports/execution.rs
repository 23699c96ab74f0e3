//! Execution Port
//!
//! Contract for the trade-execution collaborator. Signing and submission
//! live behind this trait; the engine only hands over decisions and takes
//! back fills.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::TradeDecision;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Execution rejected: {0}")]
    Rejected(String),
    #[error("Execution failed: {0}")]
    Failed(String),
}

/// Confirmed fill for an executed decision
#[derive(Debug, Clone)]
pub struct ExecutionReceipt {
    pub signature: String,
    pub filled_quantity: f64,
    pub fill_price: f64,
}

#[async_trait]
pub trait ExecutionPort: Send + Sync {
    async fn execute(&self, decision: &TradeDecision) -> Result<ExecutionReceipt, ExecutionError>;
}
