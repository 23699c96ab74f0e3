//! Transaction Source Port
//!
//! Abstraction over wherever raw transactions come from (an RPC node in
//! production, scripted fixtures in tests). Errors are transient from the
//! monitor's point of view: the worker logs, backs off, and retries.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("RPC request failed: {0}")]
    Rpc(String),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    #[error("Malformed transaction payload: {0}")]
    Malformed(String),
}

/// Signature list entry returned by the source, most recent first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureInfo {
    pub signature: String,
    pub slot: u64,
}

/// One instruction with its program id resolved and accounts expanded
#[derive(Debug, Clone, Default)]
pub struct RawInstruction {
    pub program_id: String,
    pub accounts: Vec<String>,
    /// Instruction payload as the source encoded it (base58, occasionally
    /// base64); the classifier tries both
    pub data: String,
}

/// Source-provided transaction record. Ephemeral: owned by the classifier
/// call that consumes it.
#[derive(Debug, Clone, Default)]
pub struct RawTransaction {
    pub signature: String,
    /// False when the chain recorded an execution error
    pub success: bool,
    pub account_keys: Vec<String>,
    pub instructions: Vec<RawInstruction>,
    pub log_messages: Vec<String>,
    /// Native balances per account, before and after, in lamports
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    pub block_time: Option<i64>,
}

impl RawTransaction {
    /// Net lamport change for `address`, post minus pre. None when the
    /// address is not in the account list or balance arrays are short.
    pub fn native_balance_delta(&self, address: &str) -> Option<i64> {
        let index = self.account_keys.iter().position(|k| k == address)?;
        let pre = *self.pre_balances.get(index)? as i64;
        let post = *self.post_balances.get(index)? as i64;
        Some(post - pre)
    }
}

/// Contract the wallet monitor polls against
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Most recent `limit` signatures for `address`, newest first
    async fn recent_signatures(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, SourceError>;

    /// Full transaction record, or None when the node has no record of it
    async fn fetch_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<RawTransaction>, SourceError>;
}
