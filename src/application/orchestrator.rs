//! Pipeline Orchestrator
//!
//! Wires the detection pipeline together: transaction source -> wallet
//! monitor -> dispatcher -> rule engine -> execution port, with the price
//! tracker feeding quote signals for held tokens into the same dispatcher.
//! Every collaborator is passed in explicitly; the orchestrator owns only
//! the wiring and lifecycle, not the policy.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::dedup::SignatureCache;
use crate::domain::event::{DecisionAction, EventTopic, PipelineEvent, TradeDecision};
use crate::domain::stats::{StatsSnapshot, TrackerStats};
use crate::engine::RuleEngine;
use crate::monitor::{EventDispatcher, PriceTracker, Subscriber, WalletMonitor};
use crate::ports::{ExecutionPort, MarketDataPort, TransactionSource};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Dispatcher subscriber that feeds events into the rule engine and routes
/// resulting decisions to the execution port. Confirmed fills flow straight
/// back into the engine's position book.
pub struct EngineSubscriber {
    engine: Arc<RuleEngine>,
    executor: Arc<dyn ExecutionPort>,
}

impl EngineSubscriber {
    pub fn new(engine: Arc<RuleEngine>, executor: Arc<dyn ExecutionPort>) -> Self {
        Self { engine, executor }
    }

    async fn act_on(&self, decision: TradeDecision) -> anyhow::Result<()> {
        let receipt = self.executor.execute(&decision).await?;
        match decision.action {
            DecisionAction::Enter => {
                self.engine.record_buy(
                    &decision.token_address,
                    receipt.filled_quantity,
                    receipt.fill_price,
                )?;
            }
            DecisionAction::Exit => {
                self.engine.record_sell(
                    &decision.token_address,
                    receipt.filled_quantity,
                    receipt.fill_price,
                )?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Subscriber for EngineSubscriber {
    fn name(&self) -> &str {
        "rule-engine"
    }

    async fn handle(&self, event: &PipelineEvent) -> anyhow::Result<()> {
        let decision = match event {
            PipelineEvent::Detected(detected) => self.engine.on_event(detected),
            PipelineEvent::PriceUpdate {
                token_address,
                price,
                pct_change,
            } => self.engine.on_price_update(token_address, *price, *pct_change),
            PipelineEvent::VolumeSpike {
                token_address,
                ratio,
            } => self.engine.on_volume_spike(token_address, *ratio),
        };

        if let Some(decision) = decision {
            self.act_on(decision).await?;
        }
        Ok(())
    }
}

/// Assembled pipeline with its lifecycle handles
pub struct Orchestrator {
    monitor: Arc<WalletMonitor>,
    tracker: Arc<PriceTracker>,
    engine: Arc<RuleEngine>,
    dispatcher: Arc<EventDispatcher>,
    stats: Arc<TrackerStats>,
}

impl Orchestrator {
    /// Build the pipeline from config and the three injected edges (where
    /// transactions come from, where quotes come from, where orders go).
    pub async fn build(
        config: &Config,
        source: Arc<dyn TransactionSource>,
        market_data: Arc<dyn MarketDataPort>,
        executor: Arc<dyn ExecutionPort>,
    ) -> Result<Self, OrchestratorError> {
        let rules = config
            .compiled_rules()
            .map_err(|e| OrchestratorError::ConfigError(e.to_string()))?;
        let engine = Arc::new(RuleEngine::new(rules, config.into()));

        let dedup = Arc::new(SignatureCache::new(config.monitor.dedup_capacity));
        let dispatcher = Arc::new(EventDispatcher::new());
        let stats = Arc::new(TrackerStats::new());

        let monitor = Arc::new(WalletMonitor::new(
            source,
            dedup,
            Arc::clone(&dispatcher),
            Arc::clone(&stats),
            config.into(),
            config.tracking.wallets.iter().cloned(),
        ));

        // Quotes for held tokens feed the same dispatcher the monitor does
        let tracker = Arc::new(PriceTracker::new(
            market_data,
            Arc::clone(&dispatcher),
            Arc::clone(&engine),
            config.into(),
        ));

        // The engine listens on every topic it can act on
        let subscriber: Arc<dyn Subscriber> =
            Arc::new(EngineSubscriber::new(Arc::clone(&engine), executor));
        for topic in [
            EventTopic::WalletBuy,
            EventTopic::WalletSell,
            EventTopic::NewToken,
            EventTopic::PriceUpdate,
            EventTopic::VolumeSpike,
        ] {
            dispatcher.subscribe(topic, Arc::clone(&subscriber)).await;
        }

        Ok(Self {
            monitor,
            tracker,
            engine,
            dispatcher,
            stats,
        })
    }

    pub async fn start(&self) {
        self.monitor.start().await;
        self.tracker.start().await;
        info!("pipeline started");
    }

    pub async fn stop(&self) {
        self.tracker.stop().await;
        self.monitor.stop().await;
        let snapshot = self.stats.snapshot();
        info!(
            events = snapshot.events_processed,
            buys = snapshot.buys_detected,
            sells = snapshot.sells_detected,
            creates = snapshot.creates_detected,
            errors = snapshot.errors,
            open_positions = self.engine.open_position_count(),
            realized_pnl = self.engine.realized_pnl(),
            "pipeline stopped"
        );
        if self.engine.open_position_count() > 0 {
            warn!("stopping with open positions");
        }
    }

    pub fn engine(&self) -> &Arc<RuleEngine> {
        &self.engine
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    pub fn monitor(&self) -> &Arc<WalletMonitor> {
        &self.monitor
    }

    pub fn tracker(&self) -> &Arc<PriceTracker> {
        &self.tracker
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}
