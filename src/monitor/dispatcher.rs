//! Event Dispatcher
//!
//! Per-topic subscriber registry with fault isolation. Every subscriber is
//! one uniform abstraction - an async `Subscriber` whose `handle` is always
//! awaited - so synchronous and asynchronous callbacks take the same path.
//!
//! Guarantees: subscribers for one topic run in registration order; a
//! subscriber error is logged and never blocks later subscribers or other
//! events. No ordering is promised between topics.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::domain::event::{EventTopic, PipelineEvent};

#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Identifier used in failure logs
    fn name(&self) -> &str {
        "subscriber"
    }

    async fn handle(&self, event: &PipelineEvent) -> anyhow::Result<()>;
}

/// Adapter turning a plain closure into a `Subscriber`
struct FnSubscriber<F> {
    name: String,
    callback: F,
}

#[async_trait]
impl<F> Subscriber for FnSubscriber<F>
where
    F: Fn(&PipelineEvent) -> anyhow::Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &PipelineEvent) -> anyhow::Result<()> {
        (self.callback)(event)
    }
}

#[derive(Default)]
pub struct EventDispatcher {
    subscribers: RwLock<HashMap<EventTopic, Vec<Arc<dyn Subscriber>>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, topic: EventTopic, subscriber: Arc<dyn Subscriber>) {
        let mut map = self.subscribers.write().await;
        let list = map.entry(topic).or_default();
        list.push(subscriber);
        debug!(?topic, total = list.len(), "subscriber registered");
    }

    /// Register a synchronous closure for one topic
    pub async fn subscribe_fn<F>(&self, topic: EventTopic, name: &str, callback: F)
    where
        F: Fn(&PipelineEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(
            topic,
            Arc::new(FnSubscriber {
                name: name.to_string(),
                callback,
            }),
        )
        .await;
    }

    // Outward registration surface for UI/telemetry collaborators

    pub async fn on_new_token(&self, subscriber: Arc<dyn Subscriber>) {
        self.subscribe(EventTopic::NewToken, subscriber).await;
    }

    pub async fn on_wallet_buy(&self, subscriber: Arc<dyn Subscriber>) {
        self.subscribe(EventTopic::WalletBuy, subscriber).await;
    }

    pub async fn on_price_update(&self, subscriber: Arc<dyn Subscriber>) {
        self.subscribe(EventTopic::PriceUpdate, subscriber).await;
    }

    pub async fn on_volume_spike(&self, subscriber: Arc<dyn Subscriber>) {
        self.subscribe(EventTopic::VolumeSpike, subscriber).await;
    }

    /// Deliver an event to every subscriber of its topic, in registration
    /// order. Failures are isolated per subscriber.
    pub async fn publish(&self, event: &PipelineEvent) {
        let topic = event.topic();
        let list = {
            let map = self.subscribers.read().await;
            match map.get(&topic) {
                Some(list) => list.clone(),
                None => return,
            }
        };

        for subscriber in list {
            if let Err(e) = subscriber.handle(event).await {
                error!(
                    subscriber = subscriber.name(),
                    ?topic,
                    error = %e,
                    "subscriber failed, continuing delivery"
                );
            }
        }
    }

    pub async fn subscriber_count(&self, topic: EventTopic) -> usize {
        self.subscribers
            .read()
            .await
            .get(&topic)
            .map(Vec::len)
            .unwrap_or(0)
    }
}
