//! The update type and the queue all producers funnel into.

use crate::traits::{ConfigChange, TriggerMessage};
use tokio::sync::mpsc;
use tracing::warn;

/// One event flowing through the skill's single dispatch path.
#[derive(Debug, Clone)]
pub enum Update {
    /// Inbound command message from the pub/sub transport.
    Trigger(TriggerMessage),
    /// A watched configuration key changed.
    Config(ConfigChange),
    /// A declared dependency became reachable.
    Dependency(String),
}

impl Update {
    /// The kind of this update.
    pub fn kind(&self) -> UpdateKind {
        match self {
            Self::Trigger(_) => UpdateKind::Trigger,
            Self::Config(_) => UpdateKind::Config,
            Self::Dependency(_) => UpdateKind::Dependency,
        }
    }
}

/// Kinds of updates a skill reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    /// An inbound command trigger.
    Trigger,
    /// A configuration change.
    Config,
    /// A dependency availability change.
    Dependency,
}

impl UpdateKind {
    /// String form, used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::Config => "config",
            Self::Dependency => "dependency",
        }
    }
}

/// Create the update queue: unbounded, many producers, one consumer.
pub fn update_queue() -> (UpdateSender, UpdateReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (UpdateSender(tx), UpdateReceiver(rx))
}

/// Producer half of the update queue. Cheap to clone, one per source.
#[derive(Debug, Clone)]
pub struct UpdateSender(mpsc::UnboundedSender<Update>);

impl UpdateSender {
    /// Push an update. Never blocks.
    ///
    /// Producers are expected to stop before the queue closes at shutdown;
    /// a send that loses that race is dropped and logged.
    pub fn send(&self, update: Update) {
        if let Err(err) = self.0.send(update) {
            warn!(
                kind = err.0.kind().as_str(),
                "update queue closed, dropping update"
            );
        }
    }
}

/// Consumer half of the update queue. Owned by the dispatch loop.
#[derive(Debug)]
pub struct UpdateReceiver(mpsc::UnboundedReceiver<Update>);

impl UpdateReceiver {
    /// Receive the next update, suspending while the queue is open and
    /// empty. Returns `None` once the queue is closed and drained.
    pub async fn recv(&mut self) -> Option<Update> {
        self.0.recv().await
    }

    /// Close the queue. Called exactly once, at shutdown, after
    /// cancellation.
    pub fn close(&mut self) {
        self.0.close();
    }
}
