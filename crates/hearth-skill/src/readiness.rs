//! One-shot readiness over a declared dependency set.

use std::collections::HashSet;
use tokio::sync::watch;

/// Tracks which declared dependencies have been observed online and fires
/// a one-time signal the instant all of them have been.
///
/// The transition is terminal. A dependency going offline later does not
/// revoke readiness, and observations of undeclared names are ignored.
#[derive(Debug)]
pub struct ReadinessGate {
    declared: HashSet<String>,
    observed: HashSet<String>,
    satisfied_tx: watch::Sender<bool>,
}

impl ReadinessGate {
    /// Build a gate for the declared set. An empty set is satisfied
    /// immediately.
    pub fn new(declared: &[String]) -> Self {
        let declared: HashSet<String> = declared.iter().cloned().collect();
        let (satisfied_tx, _) = watch::channel(declared.is_empty());
        Self {
            declared,
            observed: HashSet::new(),
            satisfied_tx,
        }
    }

    /// A waitable handle onto the gate's signal.
    pub fn signal(&self) -> ReadinessSignal {
        ReadinessSignal {
            satisfied_rx: self.satisfied_tx.subscribe(),
        }
    }

    /// Record one dependency observed online.
    ///
    /// Returns `true` the first time the observation completes the declared
    /// set. Duplicates and undeclared names return `false`.
    pub fn observe(&mut self, name: &str) -> bool {
        if !self.declared.contains(name) {
            return false;
        }
        self.observed.insert(name.to_string());
        if !*self.satisfied_tx.borrow() && self.observed.len() == self.declared.len() {
            let _ = self.satisfied_tx.send(true);
            return true;
        }
        false
    }

    /// Whether the gate has fired.
    pub fn is_satisfied(&self) -> bool {
        *self.satisfied_tx.borrow()
    }
}

/// Waitable handle; resolves once every declared dependency has been
/// online at least once. Waiting after the gate fired returns immediately.
#[derive(Debug, Clone)]
pub struct ReadinessSignal {
    satisfied_rx: watch::Receiver<bool>,
}

impl ReadinessSignal {
    /// Wait until the gate is satisfied.
    pub async fn wait(&mut self) {
        // A dropped gate can no longer fire; unblock rather than hang.
        let _ = self.satisfied_rx.wait_for(|satisfied| *satisfied).await;
    }

    /// Whether the gate has fired.
    pub fn is_satisfied(&self) -> bool {
        *self.satisfied_rx.borrow()
    }
}
