//! Client for the expression (speech) service.

use crate::traits::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Name of the dependency that provides the outbound speech capability.
pub const EXPRESSION_SERVICE: &str = "expression";

/// Method name of the one-way speak call.
const SPEAK_METHOD: &str = "expression.speak";

/// One-way call body for the expression service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sentence {
    /// Text to speak.
    pub value: String,
    /// Speak on every connected output instead of the default one.
    pub broadcast: bool,
    /// Specific output to speak on; empty means the default output.
    pub target: String,
    /// Optional dialogue context forwarded with the sentence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl Sentence {
    /// Plain spoken sentence: default output, no broadcast, no context.
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }
}

/// Outbound speech client, bound to the expression service's connection.
///
/// Calls are fire and forget. Failures are logged and never retried; the
/// dispatch loop must not stall on a slow speech backend.
#[derive(Debug, Clone)]
pub struct Express {
    conn: Connection,
}

impl Express {
    /// Bind a client to the expression service's connection.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Speak a plain sentence on the default output.
    pub async fn talk(&self, sentence: impl Into<String>) {
        self.speak(Sentence::plain(sentence)).await;
    }

    /// Speak a sentence on every connected output.
    pub async fn broadcast(&self, sentence: impl Into<String>) {
        self.speak(Sentence {
            value: sentence.into(),
            broadcast: true,
            ..Sentence::default()
        })
        .await;
    }

    /// Fire the one-way speak call.
    pub async fn speak(&self, sentence: Sentence) {
        let body = match serde_json::to_vec(&sentence) {
            Ok(body) => body,
            Err(err) => {
                warn!(error = %err, "could not encode sentence");
                return;
            }
        };
        if let Err(err) = self.conn.channel().notify(SPEAK_METHOD, body).await {
            warn!(error = %err, endpoint = self.conn.endpoint(), "expression call failed");
        }
    }
}
