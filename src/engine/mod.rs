//! Decision Layer
//!
//! The rule engine turns detected wallet activity and market signals into
//! trade decisions, and owns the position book.

pub mod rule_engine;

pub use rule_engine::{EngineConfig, RuleEngine};
