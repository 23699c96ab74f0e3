//! Mirrorbot - Solana Wallet Copy-Trading Pipeline
//!
//! Watches a set of tracked wallets, classifies their on-chain activity
//! (buys, sells, token launches) across the common venues, and turns that
//! activity into mirrored trade decisions through a prioritized rule set.
//!
//! # Modules
//!
//! - `domain`: Core types (events, venues, rules, positions, dedup, stats)
//! - `ports`: Trait abstractions (TransactionSource, ExecutionPort)
//! - `monitor`: Polling wallet workers, classifier, event dispatcher
//! - `engine`: Rule engine and position bookkeeping
//! - `adapters`: External implementations (Solana RPC, paper execution, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Pipeline wiring and lifecycle

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod engine;
pub mod monitor;
pub mod ports;
