//! Wallet Monitor
//!
//! One polling worker per tracked wallet. Each cycle pulls the most recent
//! signatures, skips anything already in the dedup cache, fetches and
//! classifies the rest, and publishes matches to the dispatcher. Source
//! errors back the worker off without killing it; stopping the monitor
//! aborts the workers and abandons in-flight fetches. Cache and engine
//! state live outside the monitor and survive a stop/start cycle.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::classifier::classify;
use super::dispatcher::EventDispatcher;
use crate::domain::dedup::SignatureCache;
use crate::domain::event::{EventKind, PipelineEvent};
use crate::domain::stats::TrackerStats;
use crate::ports::transaction_source::{SourceError, TransactionSource};

/// Default number of recent signatures requested per cycle
pub const DEFAULT_SIGNATURE_LIMIT: usize = 20;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Pause between poll cycles
    pub poll_interval: Duration,
    /// Longer pause after a source error
    pub error_backoff: Duration,
    /// Signatures requested per cycle
    pub signature_limit: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(400),
            error_backoff: Duration::from_secs(3),
            signature_limit: DEFAULT_SIGNATURE_LIMIT,
        }
    }
}

pub struct WalletMonitor {
    source: Arc<dyn TransactionSource>,
    dedup: Arc<SignatureCache>,
    dispatcher: Arc<EventDispatcher>,
    stats: Arc<TrackerStats>,
    config: MonitorConfig,
    tracked: Mutex<HashSet<String>>,
    workers: Mutex<HashMap<String, JoinHandle<()>>>,
    running: Arc<RwLock<bool>>,
}

impl WalletMonitor {
    pub fn new(
        source: Arc<dyn TransactionSource>,
        dedup: Arc<SignatureCache>,
        dispatcher: Arc<EventDispatcher>,
        stats: Arc<TrackerStats>,
        config: MonitorConfig,
        wallets: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            source,
            dedup,
            dispatcher,
            stats,
            config,
            tracked: Mutex::new(wallets.into_iter().collect()),
            workers: Mutex::new(HashMap::new()),
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    pub async fn tracked_wallets(&self) -> Vec<String> {
        self.tracked.lock().await.iter().cloned().collect()
    }

    /// Start one worker per tracked wallet. No-op when already running.
    pub async fn start(&self) {
        if *self.running.read().await {
            warn!("wallet monitor already running");
            return;
        }
        *self.running.write().await = true;

        let wallets = self.tracked_wallets().await;
        if wallets.is_empty() {
            info!("no wallets configured for tracking");
            return;
        }

        info!(count = wallets.len(), "starting wallet monitor");
        for wallet in wallets {
            self.spawn_worker(wallet).await;
        }
    }

    /// Track an additional wallet. When the monitor is running the new
    /// worker starts immediately without disturbing existing workers.
    pub async fn add_wallet(&self, address: &str) {
        let inserted = self.tracked.lock().await.insert(address.to_string());
        if !inserted {
            return;
        }
        info!(wallet = short(address), "added tracked wallet");
        if *self.running.read().await {
            self.spawn_worker(address.to_string()).await;
        }
    }

    /// Stop all workers. In-flight fetches are abandoned; dedup cache and
    /// downstream state are untouched.
    pub async fn stop(&self) {
        *self.running.write().await = false;
        let mut workers = self.workers.lock().await;
        for (wallet, handle) in workers.drain() {
            handle.abort();
            debug!(wallet = short(&wallet), "worker stopped");
        }
        info!("wallet monitor stopped");
    }

    async fn spawn_worker(&self, wallet: String) {
        let mut workers = self.workers.lock().await;
        if workers.contains_key(&wallet) {
            return;
        }

        let source = Arc::clone(&self.source);
        let dedup = Arc::clone(&self.dedup);
        let dispatcher = Arc::clone(&self.dispatcher);
        let stats = Arc::clone(&self.stats);
        let running = Arc::clone(&self.running);
        let config = self.config.clone();
        let worker_wallet = wallet.clone();

        let handle = tokio::spawn(async move {
            run_worker(
                source,
                dedup,
                dispatcher,
                stats,
                running,
                config,
                worker_wallet,
            )
            .await;
        });
        workers.insert(wallet, handle);
    }
}

/// Per-wallet polling loop: poll, sleep, repeat; back off on source errors.
async fn run_worker(
    source: Arc<dyn TransactionSource>,
    dedup: Arc<SignatureCache>,
    dispatcher: Arc<EventDispatcher>,
    stats: Arc<TrackerStats>,
    running: Arc<RwLock<bool>>,
    config: MonitorConfig,
    wallet: String,
) {
    debug!(wallet = short(&wallet), "worker started");
    while *running.read().await {
        let pause = match poll_wallet_once(
            source.as_ref(),
            &dedup,
            &dispatcher,
            &stats,
            &wallet,
            config.signature_limit,
        )
        .await
        {
            Ok(_) => config.poll_interval,
            Err(e) => {
                warn!(wallet = short(&wallet), error = %e, "poll failed, backing off");
                stats.record_error();
                config.error_backoff
            }
        };
        tokio::time::sleep(pause).await;
    }
    debug!(wallet = short(&wallet), "worker exiting");
}

/// One poll cycle for one wallet. Returns the number of events published.
///
/// Signatures are processed in the order the source returned them. A fetched
/// signature is claimed in the dedup cache whether or not it classified; a
/// transient fetch error leaves it unclaimed so the next cycle retries it.
/// The claim happens after the fetch in a single check-and-mark, so a
/// signature shared by two wallets is published by exactly one worker even
/// when their fetches overlap.
pub async fn poll_wallet_once(
    source: &dyn TransactionSource,
    dedup: &SignatureCache,
    dispatcher: &EventDispatcher,
    stats: &TrackerStats,
    wallet: &str,
    limit: usize,
) -> Result<usize, SourceError> {
    let signatures = source.recent_signatures(wallet, limit).await?;
    let mut published = 0;

    for info in signatures {
        if dedup.seen(&info.signature) {
            continue;
        }

        let tx = source.fetch_transaction(&info.signature).await?;
        // Another worker may have claimed the signature during the fetch
        if !dedup.mark_if_unseen(&info.signature) {
            continue;
        }

        let Some(tx) = tx else {
            debug!(signature = short(&info.signature), "no transaction record");
            continue;
        };

        let Some(event) = classify(&tx, wallet) else {
            continue;
        };

        match event.kind {
            EventKind::Buy => {
                stats.record_buy();
                info!(
                    wallet = short(wallet),
                    token = short(&event.token_address),
                    sol = event.amount_sol(),
                    venue = %event.venue,
                    "BUY detected"
                );
            }
            EventKind::Sell => {
                stats.record_sell();
                info!(
                    wallet = short(wallet),
                    token = short(&event.token_address),
                    sol = event.amount_sol(),
                    venue = %event.venue,
                    "SELL detected"
                );
            }
            EventKind::Create => {
                stats.record_create();
                info!(
                    wallet = short(wallet),
                    token = short(&event.token_address),
                    venue = %event.venue,
                    "CREATE detected"
                );
            }
        }

        dispatcher.publish(&PipelineEvent::Detected(event)).await;
        published += 1;
    }

    Ok(published)
}

/// Abbreviate an address for log lines
fn short(address: &str) -> &str {
    address.get(..8).unwrap_or(address)
}
