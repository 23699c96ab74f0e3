//! Adapters Layer
//!
//! Concrete implementations of the ports: Solana RPC as the transaction
//! source, Jupiter for quotes, paper execution for fills, and the CLI
//! surface.

pub mod cli;
pub mod execution;
pub mod market_data;
pub mod solana;
