//! Topic-keyed notification bus.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

/// Delivery quality of service requested by the publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QoS {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

/// A published notification.
#[derive(Debug, Clone)]
pub struct Notification {
    pub topic: String,
    pub payload: Value,
    pub qos: QoS,
    pub retain: bool,
}

/// Notification collaborator consumed by the station controller.
///
/// Publishing is best effort: the returned boolean reports delivery into the
/// transport, and having no subscribers is still success. Failures never
/// block the operation that published.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, topic: &str, payload: &Value, qos: QoS, retain: bool) -> bool;
}

/// Builds the state topic for a station: `"<namespace>/station<id>/state"`.
pub fn station_state_topic(namespace: &str, station_id: u32) -> String {
    format!("{namespace}/station{station_id}/state")
}

/// Subscription handle returned by [`TopicBus::subscribe`].
pub struct TopicSubscription {
    pub subscription_id: String,
    /// Retained notification on this topic, delivered at subscribe time.
    pub retained: Option<Notification>,
    pub receiver: broadcast::Receiver<Notification>,
}

/// In-process pub/sub over per-topic broadcast channels.
pub struct TopicBus {
    /// Per-topic broadcast channels.
    channels: DashMap<String, broadcast::Sender<Notification>>,

    /// Last retained notification per topic.
    retained: DashMap<String, Notification>,

    /// Subscription id -> topic.
    subscriptions: DashMap<String, String>,

    /// Channel capacity.
    capacity: usize,
}

impl TopicBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            retained: DashMap::new(),
            subscriptions: DashMap::new(),
            capacity,
        }
    }

    /// Subscribes to a topic. A retained notification, if present, is handed
    /// back immediately so late subscribers see the current state.
    pub fn subscribe(&self, topic: &str) -> TopicSubscription {
        let subscription_id = format!("sub-{}", uuid::Uuid::new_v4());

        let sender = self
            .channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone();
        let receiver = sender.subscribe();

        self.subscriptions
            .insert(subscription_id.clone(), topic.to_string());

        TopicSubscription {
            subscription_id,
            retained: self.retained.get(topic).map(|n| n.clone()),
            receiver,
        }
    }

    /// Removes a subscription. Returns true if it was known.
    pub fn unsubscribe(&self, subscription_id: &str) -> bool {
        self.subscriptions.remove(subscription_id).is_some()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

impl Default for TopicBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl Notifier for TopicBus {
    async fn publish(&self, topic: &str, payload: &Value, qos: QoS, retain: bool) -> bool {
        let notification = Notification {
            topic: topic.to_string(),
            payload: payload.clone(),
            qos,
            retain,
        };

        if retain {
            self.retained
                .insert(topic.to_string(), notification.clone());
        }

        if let Some(sender) = self.channels.get(topic) {
            // Ignore send errors (no receivers).
            let _ = sender.send(notification);
        }

        true
    }
}
