//! # Hearth Skill Runtime
//!
//! A lightweight runtime for building assistant skills. A skill registers
//! command handlers, waits for its declared dependencies to come online,
//! and reacts to inbound triggers, configuration changes, and dependency
//! availability changes through one unified update channel.
//!
//! ## Architecture Overview
//!
//! Every producer pushes into a single queue drained by one dispatch loop,
//! so handlers and the config callback never run concurrently:
//!
//! ```text
//! ┌────────────────┐
//! │ Trigger Source │──┐
//! ├────────────────┤  │   ┌─────────────┐   ┌────────────────────┐
//! │ Config Source  │──┼──▶│ UpdateQueue │──▶│     Dispatcher     │
//! ├────────────────┤  │   └─────────────┘   │ handlers / config  │
//! │ Dep. Source    │──┘                     │ callback / express │
//! └───────┬────────┘                        └────────────────────┘
//!         │
//!         ▼
//! ┌────────────────┐
//! │ ReadinessGate  │  blocks `run` until all dependencies are online
//! └────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hearth_skill::backends::memory::{MemoryBroker, MemoryConfigStore, MemoryDiscovery};
//! use hearth_skill::Skill;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut skill = Skill::builder("acme", "greeter", "1.0.0")
//!         .transport(Arc::new(MemoryBroker::new()))
//!         .discovery(Arc::new(MemoryDiscovery::new()))
//!         .config_store(Arc::new(MemoryConfigStore::new()))
//!         .build()
//!         .await?;
//!
//!     skill
//!         .add_handler("greet", |ctx| async move {
//!             if let Some(express) = &ctx.express {
//!                 express.talk(format!("Hello, {}!", ctx.data.text)).await;
//!             }
//!         })
//!         .await?;
//!
//!     skill.run().await?;
//!     Ok(())
//! }
//! ```

pub mod backends;
mod dispatch;
pub mod error;
mod express;
mod identity;
pub mod logging;
mod payload;
mod readiness;
mod skill;
mod sources;
pub mod traits;
mod update;

pub use dispatch::{ConfigUpdateFn, HandlerFn, TriggerContext};
pub use error::{Error, Result};
pub use express::{Express, Sentence, EXPRESSION_SERVICE};
pub use identity::SkillIdentity;
pub use payload::{Data, OutputContext};
pub use readiness::{ReadinessGate, ReadinessSignal};
pub use skill::{ConfigHandle, Skill, SkillBuilder};
pub use traits::{
    ConfigChange, ConfigStore, Connection, Discovery, MessageCallback, QoS, Registration,
    ServiceChannel, Transport, TriggerMessage,
};
pub use update::{update_queue, Update, UpdateKind, UpdateReceiver, UpdateSender};
