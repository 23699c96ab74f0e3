//! Detection Events and Trade Decisions
//!
//! Immutable event snapshots produced by the classifier and consumed by the
//! dispatcher and rule engine. Price/volume signals share the same pipeline
//! envelope so one dispatcher carries every topic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::venues::Venue;

/// Sentinel used when the classifier cannot confidently extract a token mint
pub const UNKNOWN_TOKEN: &str = "unknown";

/// Operation type detected on a tracked wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Buy,
    Sell,
    Create,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Buy => write!(f, "buy"),
            EventKind::Sell => write!(f, "sell"),
            EventKind::Create => write!(f, "create"),
        }
    }
}

/// A classified transaction from a tracked wallet. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedEvent {
    pub kind: EventKind,
    pub source_wallet: String,
    /// Token mint, or [`UNKNOWN_TOKEN`] when extraction failed
    pub token_address: String,
    /// Approximate trade size in lamports (0 when not parseable)
    pub amount_lamports: u64,
    pub venue: Venue,
    pub signature: String,
    pub observed_at: DateTime<Utc>,
}

impl DetectedEvent {
    pub fn new(
        kind: EventKind,
        source_wallet: impl Into<String>,
        token_address: impl Into<String>,
        amount_lamports: u64,
        venue: Venue,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            source_wallet: source_wallet.into(),
            token_address: token_address.into(),
            amount_lamports,
            venue,
            signature: signature.into(),
            observed_at: Utc::now(),
        }
    }

    pub fn amount_sol(&self) -> f64 {
        self.amount_lamports as f64 / 1e9
    }
}

/// Everything that flows through the dispatcher
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Detected(DetectedEvent),
    PriceUpdate {
        token_address: String,
        price: f64,
        pct_change: f64,
    },
    VolumeSpike {
        token_address: String,
        ratio: f64,
    },
}

/// Subscription topics, one callback list per topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTopic {
    WalletBuy,
    WalletSell,
    NewToken,
    PriceUpdate,
    VolumeSpike,
}

impl PipelineEvent {
    pub fn topic(&self) -> EventTopic {
        match self {
            PipelineEvent::Detected(e) => match e.kind {
                EventKind::Buy => EventTopic::WalletBuy,
                EventKind::Sell => EventTopic::WalletSell,
                EventKind::Create => EventTopic::NewToken,
            },
            PipelineEvent::PriceUpdate { .. } => EventTopic::PriceUpdate,
            PipelineEvent::VolumeSpike { .. } => EventTopic::VolumeSpike,
        }
    }
}

/// What to do about a detected opportunity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionAction {
    Enter,
    Exit,
}

/// Output of the rule engine. Emitted, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeDecision {
    pub action: DecisionAction,
    pub token_address: String,
    /// SOL lamports to spend on an Enter; token base units to sell on an
    /// Exit. Exits stay fractional so a partly filled position is never
    /// rounded into dust the book can't close.
    pub size: f64,
    /// Name of the rule (or entry path) that produced this decision
    pub triggering_rule: String,
}
