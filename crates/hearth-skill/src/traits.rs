//! Boundary traits for the external collaborators of a skill.
//!
//! A skill talks to three backends it does not own: a pub/sub transport
//! for inbound triggers, a discovery service for dependency tracking and
//! instance registration, and a configuration store. Each is modeled as a
//! trait so tests and demos can run against the in-memory implementations
//! in [`crate::backends`]. Connection management, keepalive, and reconnect
//! policy belong to the backend; transitions are logged there, never
//! escalated to the dispatch loop.

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Delivery guarantee requested for a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QoS {
    /// Fire and forget.
    AtMostOnce,
    /// Redelivered until acknowledged.
    AtLeastOnce,
    /// Exactly once, where the transport supports it.
    ExactlyOnce,
}

/// An inbound pub/sub message as delivered by the transport.
///
/// Clones share the acknowledgment state, so acking any clone marks the
/// delivery as received.
#[derive(Clone)]
pub struct TriggerMessage {
    topic: String,
    payload: Vec<u8>,
    acked: Arc<AtomicBool>,
}

impl TriggerMessage {
    /// Create a message for the given topic and raw payload.
    pub fn new(topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            payload,
            acked: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Topic the message was published on.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Raw payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Signal successful receipt to the transport, preventing redelivery.
    pub fn ack(&self) {
        self.acked.store(true, Ordering::Release);
    }

    /// Whether the message has been acknowledged.
    pub fn is_acked(&self) -> bool {
        self.acked.load(Ordering::Acquire)
    }
}

impl fmt::Debug for TriggerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerMessage")
            .field("topic", &self.topic)
            .field("payload_len", &self.payload.len())
            .field("acked", &self.is_acked())
            .finish()
    }
}

/// Callback invoked on the transport's delivery task for each message.
pub type MessageCallback = Arc<dyn Fn(TriggerMessage) + Send + Sync>;

/// Pub/sub transport boundary.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Subscribe to a topic. The callback runs on the transport's own
    /// delivery task and must not block for long.
    async fn subscribe(&self, topic: &str, qos: QoS, on_message: MessageCallback) -> Result<()>;
}

/// Transport-agnostic channel to a discovered service.
///
/// Backends decide how calls are carried; the runtime only ever issues
/// one-way notifications over it.
#[async_trait]
pub trait ServiceChannel: Send + Sync {
    /// Fire a one-way call. No response is awaited.
    async fn notify(&self, method: &str, body: Vec<u8>) -> Result<()>;
}

/// Live connection handle for a named dependency.
#[derive(Clone)]
pub struct Connection {
    name: String,
    endpoint: String,
    channel: Arc<dyn ServiceChannel>,
}

impl Connection {
    /// Create a connection handle.
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        channel: Arc<dyn ServiceChannel>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            channel,
        }
    }

    /// Dependency name this connection points at.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved endpoint address.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The call channel carried by this connection.
    pub fn channel(&self) -> &Arc<dyn ServiceChannel> {
        &self.channel
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Instance announcement sent to the discovery backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Service name to register under.
    pub name: String,
    /// Unique id of this running instance.
    pub instance_id: String,
    /// Skill version.
    pub version: String,
    /// Optional address the instance can be reached at.
    pub address: Option<String>,
}

/// Service discovery boundary.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Declare the dependency set and start watching availability.
    ///
    /// A dependency's name is emitted on the returned stream every time its
    /// connection becomes available, including the first time.
    async fn watch_dependencies(&self, names: &[String])
        -> Result<mpsc::UnboundedReceiver<String>>;

    /// Announce this skill instance to the backend.
    async fn register(&self, registration: Registration) -> Result<()>;

    /// Live connection for a named dependency, if one is available.
    async fn get_connection(&self, name: &str) -> Option<Connection>;
}

/// A single changed key under a watched configuration namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigChange {
    /// Fully-qualified key that changed.
    pub key: String,
    /// The new value.
    pub value: Value,
}

/// Configuration store boundary.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Seed defaults under a prefix. Keys already present keep their
    /// current value, and seeding raises no change events.
    async fn seed(&self, prefix: &str, initial: Value) -> Result<()>;

    /// Read a fully-qualified key.
    async fn get(&self, key: &str) -> Option<Value>;

    /// Write a fully-qualified key. Watchers of a matching prefix are
    /// notified only when the value actually changes.
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Watch every key under the prefix.
    async fn watch(&self, prefix: &str) -> Result<mpsc::UnboundedReceiver<ConfigChange>>;
}
