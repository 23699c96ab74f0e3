//! Monitoring Layer - detection pipeline
//!
//! Polling wallet workers feed the classifier; matches fan out through the
//! event dispatcher to whatever subscribed (the rule engine, telemetry).
//! The price tracker polls quotes for held tokens and publishes the
//! price/volume signals the exit rules run on.

pub mod classifier;
pub mod dispatcher;
pub mod price_tracker;
pub mod wallet_monitor;

pub use classifier::classify;
pub use dispatcher::{EventDispatcher, Subscriber};
pub use price_tracker::{PriceTracker, PriceTrackerConfig};
pub use wallet_monitor::{MonitorConfig, WalletMonitor, DEFAULT_SIGNATURE_LIMIT};
