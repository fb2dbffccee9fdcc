//! Trigger payload decoding.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured command data decoded from a trigger message body.
///
/// Unknown fields are tolerated and missing fields take their default, so
/// handlers keep working as the intent resolver grows its payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Data {
    /// Vendor of the skill the command is addressed to.
    pub vendor: String,
    /// Skill name the command is addressed to.
    pub skill: String,
    /// Command name, matching the last topic segment.
    pub command: String,
    /// Free-text query as understood by the resolver.
    pub query: String,
    /// Free-text utterance as spoken by the user.
    pub text: String,
    /// Whether every required parameter was present in the utterance.
    pub all_required_params_present: bool,
    /// Resolved parameters, keyed by name.
    pub parameters: Map<String, Value>,
    /// Dialogue contexts attached to the command.
    pub output_contexts: Vec<OutputContext>,
}

impl Data {
    /// Decode a trigger payload.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Look up a single parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }
}

/// Dialogue context attached to a command, with its remaining lifespan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputContext {
    /// Context name.
    pub name: String,
    /// Turns the context stays alive for.
    pub lifespan: i32,
}
