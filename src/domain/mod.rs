//! Domain Layer - Core types for the copy-trading pipeline
//!
//! Pure domain types and logic with no network dependencies. All external
//! interactions happen through the ports layer.

pub mod dedup;
pub mod event;
pub mod position;
pub mod rule;
pub mod stats;
pub mod venues;

pub use dedup::SignatureCache;
pub use event::{
    DecisionAction, DetectedEvent, EventKind, EventTopic, PipelineEvent, TradeDecision,
    UNKNOWN_TOKEN,
};
pub use position::{Position, PositionBook, PositionError, SellOutcome};
pub use rule::{compile_rules, Condition, ExitMetrics, Rule, RuleAction, RuleError, RuleSpec};
pub use stats::{StatsSnapshot, TrackerStats};
pub use venues::Venue;
