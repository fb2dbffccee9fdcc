//! In-process backends for tests and demos.
//!
//! These implement the boundary traits over plain shared state so a skill
//! can run end to end without a broker, a discovery cluster, or a config
//! store. The broker delivers synchronously on the publisher's task, which
//! stands in for the transport's own delivery thread.

use crate::error::{Error, Result};
use crate::express::Sentence;
use crate::traits::{
    ConfigChange, ConfigStore, Connection, Discovery, MessageCallback, QoS, Registration,
    ServiceChannel, Transport, TriggerMessage,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

/// In-process pub/sub broker.
#[derive(Default)]
pub struct MemoryBroker {
    subscriptions: Mutex<HashMap<String, Vec<MessageCallback>>>,
}

impl MemoryBroker {
    /// Create an empty broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a payload to every subscriber of the topic.
    ///
    /// Returns the delivered message so callers can assert on its
    /// acknowledgment state.
    pub async fn publish(&self, topic: &str, payload: Vec<u8>) -> TriggerMessage {
        let message = TriggerMessage::new(topic, payload);
        let callbacks = {
            let subscriptions = self.subscriptions.lock().await;
            subscriptions.get(topic).cloned().unwrap_or_default()
        };
        for callback in callbacks {
            callback(message.clone());
        }
        message
    }

    /// Number of subscriptions currently registered for a topic.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        let subscriptions = self.subscriptions.lock().await;
        subscriptions.get(topic).map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Transport for MemoryBroker {
    async fn subscribe(&self, topic: &str, _qos: QoS, on_message: MessageCallback) -> Result<()> {
        let mut subscriptions = self.subscriptions.lock().await;
        subscriptions
            .entry(topic.to_string())
            .or_default()
            .push(on_message);
        debug!(topic, "subscribed");
        Ok(())
    }
}

/// Records one-way calls for inspection.
#[derive(Default)]
pub struct LoopbackChannel {
    calls: Mutex<Vec<(String, Vec<u8>)>>,
}

impl LoopbackChannel {
    /// All calls fired through this channel, in order.
    pub async fn calls(&self) -> Vec<(String, Vec<u8>)> {
        self.calls.lock().await.clone()
    }

    /// Sentences spoken through this channel, in order.
    pub async fn sentences(&self) -> Vec<Sentence> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|(method, _)| method == "expression.speak")
            .filter_map(|(_, body)| serde_json::from_slice(body).ok())
            .collect()
    }
}

#[async_trait]
impl ServiceChannel for LoopbackChannel {
    async fn notify(&self, method: &str, body: Vec<u8>) -> Result<()> {
        self.calls.lock().await.push((method.to_string(), body));
        Ok(())
    }
}

#[derive(Default)]
struct DiscoveryState {
    online: HashMap<String, Connection>,
    watchers: Vec<(HashSet<String>, mpsc::UnboundedSender<String>)>,
    registrations: Vec<Registration>,
}

/// In-process service discovery.
///
/// Tests drive availability with [`MemoryDiscovery::set_online`]; watchers
/// declared before or after a dependency came online both observe it.
#[derive(Default)]
pub struct MemoryDiscovery {
    state: Mutex<DiscoveryState>,
}

impl MemoryDiscovery {
    /// Create an empty discovery backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a dependency online behind a loopback connection and notify
    /// watchers. Returns the connection's channel for assertions.
    pub async fn set_online(&self, name: &str) -> Arc<LoopbackChannel> {
        let channel = Arc::new(LoopbackChannel::default());
        let conn = Connection::new(name, format!("memory://{name}"), channel.clone());

        let mut state = self.state.lock().await;
        state.online.insert(name.to_string(), conn);
        state
            .watchers
            .retain(|(declared, tx)| !declared.contains(name) || tx.send(name.to_string()).is_ok());
        channel
    }

    /// Registrations announced so far.
    pub async fn registrations(&self) -> Vec<Registration> {
        self.state.lock().await.registrations.clone()
    }
}

#[async_trait]
impl Discovery for MemoryDiscovery {
    async fn watch_dependencies(
        &self,
        names: &[String],
    ) -> Result<mpsc::UnboundedReceiver<String>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let declared: HashSet<String> = names.iter().cloned().collect();

        let mut state = self.state.lock().await;
        for name in &declared {
            if state.online.contains_key(name) {
                let _ = tx.send(name.clone());
            }
        }
        state.watchers.push((declared, tx));
        Ok(rx)
    }

    async fn register(&self, registration: Registration) -> Result<()> {
        if registration.name.is_empty() {
            return Err(Error::Registration("registration has no name".into()));
        }
        self.state.lock().await.registrations.push(registration);
        Ok(())
    }

    async fn get_connection(&self, name: &str) -> Option<Connection> {
        self.state.lock().await.online.get(name).cloned()
    }
}

#[derive(Default)]
struct ConfigState {
    values: HashMap<String, Value>,
    watchers: Vec<(String, mpsc::UnboundedSender<ConfigChange>)>,
}

/// In-process configuration store.
#[derive(Default)]
pub struct MemoryConfigStore {
    state: Mutex<ConfigState>,
}

impl MemoryConfigStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(prefix: &str, key: &str) -> bool {
        key == prefix || key.starts_with(&format!("{prefix}/"))
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn seed(&self, prefix: &str, initial: Value) -> Result<()> {
        let Value::Object(map) = initial else {
            return Err(Error::Config("initial config must be an object".into()));
        };
        let mut state = self.state.lock().await;
        for (key, value) in map {
            state
                .values
                .entry(format!("{prefix}/{key}"))
                .or_insert(value);
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Option<Value> {
        self.state.lock().await.values.get(key).cloned()
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.values.get(key) == Some(&value) {
            return Ok(());
        }
        state.values.insert(key.to_string(), value.clone());

        let change = ConfigChange {
            key: key.to_string(),
            value,
        };
        state.watchers.retain(|(prefix, tx)| {
            !Self::matches(prefix, key) || tx.send(change.clone()).is_ok()
        });
        Ok(())
    }

    async fn watch(&self, prefix: &str) -> Result<mpsc::UnboundedReceiver<ConfigChange>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state
            .lock()
            .await
            .watchers
            .push((prefix.to_string(), tx));
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn broker_delivers_to_subscribers() {
        let broker = MemoryBroker::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_cb = seen.clone();

        broker
            .subscribe(
                "skill/acme/demo/run",
                QoS::AtLeastOnce,
                Arc::new(move |message| {
                    assert_eq!(message.topic(), "skill/acme/demo/run");
                    seen_cb.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await
            .unwrap();

        broker.publish("skill/acme/demo/run", b"{}".to_vec()).await;
        broker.publish("skill/acme/demo/other", b"{}".to_vec()).await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn discovery_replays_already_online_dependencies() {
        let discovery = MemoryDiscovery::new();
        discovery.set_online("expression").await;

        let mut rx = discovery
            .watch_dependencies(&["expression".to_string()])
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap(), "expression");
    }

    #[tokio::test]
    async fn discovery_notifies_watchers_of_new_dependencies() {
        let discovery = MemoryDiscovery::new();
        let mut rx = discovery
            .watch_dependencies(&["weather".to_string()])
            .await
            .unwrap();

        discovery.set_online("weather").await;
        discovery.set_online("unrelated").await;
        assert_eq!(rx.recv().await.unwrap(), "weather");
        assert!(discovery.get_connection("weather").await.is_some());
        assert!(discovery.get_connection("missing").await.is_none());
    }

    #[tokio::test]
    async fn config_seed_keeps_existing_values() {
        let store = MemoryConfigStore::new();
        store
            .set("skill/acme/demo/greeting", json!("Hi"))
            .await
            .unwrap();
        store
            .seed("skill/acme/demo", json!({"greeting": "Hello", "volume": 5}))
            .await
            .unwrap();

        assert_eq!(store.get("skill/acme/demo/greeting").await, Some(json!("Hi")));
        assert_eq!(store.get("skill/acme/demo/volume").await, Some(json!(5)));
    }

    #[tokio::test]
    async fn config_set_notifies_matching_watchers_on_change_only() {
        let store = MemoryConfigStore::new();
        let mut rx = store.watch("skill/acme/demo").await.unwrap();

        store
            .set("skill/acme/demo/greeting", json!("Hello"))
            .await
            .unwrap();
        // Unchanged value, no event.
        store
            .set("skill/acme/demo/greeting", json!("Hello"))
            .await
            .unwrap();
        store.set("skill/other/key", json!(1)).await.unwrap();
        store
            .set("skill/acme/demo/greeting", json!("Howdy"))
            .await
            .unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.value, json!("Hello"));
        let second = rx.recv().await.unwrap();
        assert_eq!(second.value, json!("Howdy"));
    }

    #[tokio::test]
    async fn seed_rejects_non_objects() {
        let store = MemoryConfigStore::new();
        assert!(store.seed("skill/acme/demo", json!(42)).await.is_err());
    }
}
