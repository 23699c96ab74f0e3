//! Ports Layer - Trait definitions for external collaborators
//!
//! Following hexagonal architecture, these traits abstract:
//! - The transaction source the monitor polls (RPC node)
//! - Market data quotes the price tracker polls
//! - Trade execution (signing and submission live behind this seam)

pub mod execution;
pub mod market_data;
pub mod mocks;
pub mod transaction_source;

pub use execution::{ExecutionError, ExecutionPort, ExecutionReceipt};
pub use market_data::{MarketDataError, MarketDataPort, TokenQuote};
pub use transaction_source::{
    RawInstruction, RawTransaction, SignatureInfo, SourceError, TransactionSource,
};
