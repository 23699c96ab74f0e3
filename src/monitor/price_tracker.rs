//! Price Tracker
//!
//! Polls market data for every token the engine currently holds and turns
//! raw quotes into the price-update and volume-spike signals the exit rules
//! run on. Percent change is measured against the previous sample for the
//! same token; volume is compared to a rolling per-token baseline. State for
//! a token is dropped once its position closes.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::dispatcher::EventDispatcher;
use crate::domain::event::PipelineEvent;
use crate::engine::RuleEngine;
use crate::ports::market_data::MarketDataPort;

#[derive(Debug, Clone)]
pub struct PriceTrackerConfig {
    /// Pause between quote sweeps over the held tokens
    pub poll_interval: Duration,
    /// Volume samples kept per token for the spike baseline
    pub volume_window: usize,
    /// Current/baseline volume ratio at which a spike is published
    pub volume_spike_ratio: f64,
}

impl Default for PriceTrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            volume_window: 20,
            volume_spike_ratio: 3.0,
        }
    }
}

#[derive(Debug, Default)]
struct TokenState {
    last_price: Option<f64>,
    volumes: VecDeque<f64>,
}

impl TokenState {
    /// Baseline samples required before spike detection kicks in
    const MIN_BASELINE_SAMPLES: usize = 3;

    /// Ratio of `volume` to the average of prior samples
    fn volume_ratio(&self, volume: f64) -> Option<f64> {
        if self.volumes.len() < Self::MIN_BASELINE_SAMPLES {
            return None;
        }
        let baseline = self.volumes.iter().sum::<f64>() / self.volumes.len() as f64;
        (baseline > 0.0).then(|| volume / baseline)
    }

    fn push_volume(&mut self, volume: f64, window: usize) {
        self.volumes.push_back(volume);
        while self.volumes.len() > window {
            self.volumes.pop_front();
        }
    }
}

pub struct PriceTracker {
    market_data: Arc<dyn MarketDataPort>,
    dispatcher: Arc<EventDispatcher>,
    engine: Arc<RuleEngine>,
    config: PriceTrackerConfig,
    state: Arc<StdMutex<HashMap<String, TokenState>>>,
    running: Arc<RwLock<bool>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PriceTracker {
    pub fn new(
        market_data: Arc<dyn MarketDataPort>,
        dispatcher: Arc<EventDispatcher>,
        engine: Arc<RuleEngine>,
        config: PriceTrackerConfig,
    ) -> Self {
        Self {
            market_data,
            dispatcher,
            engine,
            config,
            state: Arc::new(StdMutex::new(HashMap::new())),
            running: Arc::new(RwLock::new(false)),
            worker: Mutex::new(None),
        }
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Start the polling loop. No-op when already running.
    pub async fn start(&self) {
        if *self.running.read().await {
            warn!("price tracker already running");
            return;
        }
        *self.running.write().await = true;

        let handle = tokio::spawn(run_tracker(
            Arc::clone(&self.market_data),
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.engine),
            Arc::clone(&self.state),
            Arc::clone(&self.running),
            self.config.clone(),
        ));
        *self.worker.lock().await = Some(handle);
        info!(
            interval_ms = self.config.poll_interval.as_millis() as u64,
            "price tracker started"
        );
    }

    /// Stop the polling loop; an in-flight sweep is abandoned. Per-token
    /// price state survives a stop/start cycle.
    pub async fn stop(&self) {
        *self.running.write().await = false;
        if let Some(handle) = self.worker.lock().await.take() {
            handle.abort();
        }
        info!("price tracker stopped");
    }

    /// One quote sweep over the held tokens. Returns signals published.
    pub async fn poll_once(&self) -> usize {
        poll_prices_once(
            self.market_data.as_ref(),
            &self.dispatcher,
            &self.engine,
            &self.state,
            &self.config,
        )
        .await
    }
}

async fn run_tracker(
    market_data: Arc<dyn MarketDataPort>,
    dispatcher: Arc<EventDispatcher>,
    engine: Arc<RuleEngine>,
    state: Arc<StdMutex<HashMap<String, TokenState>>>,
    running: Arc<RwLock<bool>>,
    config: PriceTrackerConfig,
) {
    debug!("price tracker loop started");
    while *running.read().await {
        poll_prices_once(market_data.as_ref(), &dispatcher, &engine, &state, &config).await;
        tokio::time::sleep(config.poll_interval).await;
    }
    debug!("price tracker loop exiting");
}

/// Sweep every held token: quote it, publish a price update, and publish a
/// volume spike when the quote's volume clears the rolling baseline. A
/// failed quote skips that token until the next sweep.
async fn poll_prices_once(
    market_data: &dyn MarketDataPort,
    dispatcher: &EventDispatcher,
    engine: &RuleEngine,
    state: &StdMutex<HashMap<String, TokenState>>,
    config: &PriceTrackerConfig,
) -> usize {
    let tokens = engine.open_tokens();
    {
        let mut state = state.lock().unwrap();
        state.retain(|token, _| tokens.iter().any(|t| t == token));
    }

    let mut published = 0;
    for token in tokens {
        let quote = match market_data.quote(&token).await {
            Ok(quote) if quote.price > 0.0 => quote,
            Ok(_) => {
                debug!(token = short(&token), "non-positive quote ignored");
                continue;
            }
            Err(e) => {
                warn!(token = short(&token), error = %e, "quote failed");
                continue;
            }
        };

        // Derive the signals under the lock, publish after releasing it
        let mut signals = Vec::new();
        {
            let mut state = state.lock().unwrap();
            let entry = state.entry(token.clone()).or_default();

            let pct_change = match entry.last_price {
                Some(prev) if prev > 0.0 => (quote.price - prev) / prev * 100.0,
                _ => 0.0,
            };
            entry.last_price = Some(quote.price);
            signals.push(PipelineEvent::PriceUpdate {
                token_address: token.clone(),
                price: quote.price,
                pct_change,
            });

            if let Some(volume) = quote.volume {
                if let Some(ratio) = entry.volume_ratio(volume) {
                    if ratio >= config.volume_spike_ratio {
                        signals.push(PipelineEvent::VolumeSpike {
                            token_address: token.clone(),
                            ratio,
                        });
                    }
                }
                entry.push_volume(volume, config.volume_window);
            }
        }

        for signal in &signals {
            dispatcher.publish(signal).await;
            published += 1;
        }
    }
    published
}

/// Abbreviate a mint for log lines
fn short(address: &str) -> &str {
    address.get(..8).unwrap_or(address)
}
