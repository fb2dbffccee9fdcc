//! Demo greeter skill.
//!
//! Runs entirely over the in-memory backends: a driver task brings the
//! expression service online and publishes a greet command, and the skill
//! answers by speaking through the expression client. Stop with ctrl-c.

use anyhow::Result;
use hearth_skill::backends::memory::{MemoryBroker, MemoryConfigStore, MemoryDiscovery};
use hearth_skill::{logging, Data, Skill, EXPRESSION_SERVICE};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init("greeter")?;

    let broker = Arc::new(MemoryBroker::new());
    let discovery = Arc::new(MemoryDiscovery::new());
    let store = Arc::new(MemoryConfigStore::new());

    let mut skill = Skill::builder("hearth", "greeter", env!("CARGO_PKG_VERSION"))
        .transport(broker.clone())
        .discovery(discovery.clone())
        .config_store(store.clone())
        .build()
        .await?;

    let config = skill.with_config(json!({"greeting": "Hello"})).await?;
    skill.on_config_update(|change| {
        info!(key = %change.key, value = %change.value, "config changed");
    });

    let greet_config = config.clone();
    skill
        .add_handler("greet", move |ctx| {
            let config = greet_config.clone();
            async move {
                let greeting = config
                    .get("greeting")
                    .await
                    .and_then(|v| v.as_str().map(String::from))
                    .unwrap_or_else(|| "Hello".to_string());
                let name = ctx
                    .data
                    .parameter("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("friend");
                match &ctx.express {
                    Some(express) => express.talk(format!("{greeting}, {name}!")).await,
                    None => info!(name, "would greet, but the expression service is gone"),
                }
            }
        })
        .await?;

    drive(
        broker.clone(),
        discovery.clone(),
        skill.identity().topic("greet"),
    );

    skill.run().await?;
    Ok(())
}

/// Simulates the outside world: dependencies come online, a command
/// arrives, and whatever the skill speaks gets printed.
fn drive(broker: Arc<MemoryBroker>, discovery: Arc<MemoryDiscovery>, topic: String) {
    tokio::spawn(async move {
        let express = discovery.set_online(EXPRESSION_SERVICE).await;

        let command = Data {
            command: "greet".into(),
            query: "greet Sam".into(),
            text: "please greet Sam".into(),
            all_required_params_present: true,
            parameters: {
                let mut map = serde_json::Map::new();
                map.insert("name".into(), json!("Sam"));
                map
            },
            ..Data::default()
        };
        let payload = match serde_json::to_vec(&command) {
            Ok(payload) => payload,
            Err(err) => {
                info!(error = %err, "could not encode demo command");
                return;
            }
        };
        broker.publish(&topic, payload).await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        for sentence in express.sentences().await {
            info!(spoken = %sentence.value, "expression service output");
        }
    });
}
