//! End-to-end tests over the in-memory backends.

use async_trait::async_trait;
use hearth_skill::backends::memory::{MemoryBroker, MemoryConfigStore, MemoryDiscovery};
use hearth_skill::{
    Connection, Data, Discovery, Error, OutputContext, Registration, Result as SkillResult, Skill,
    EXPRESSION_SERVICE,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

struct Harness {
    broker: Arc<MemoryBroker>,
    discovery: Arc<MemoryDiscovery>,
    store: Arc<MemoryConfigStore>,
}

impl Harness {
    fn new() -> Self {
        Self {
            broker: Arc::new(MemoryBroker::new()),
            discovery: Arc::new(MemoryDiscovery::new()),
            store: Arc::new(MemoryConfigStore::new()),
        }
    }

    async fn skill(&self) -> Skill {
        Skill::builder("acme", "greeter", "1.0.0")
            .transport(self.broker.clone())
            .discovery(self.discovery.clone())
            .config_store(self.store.clone())
            .build()
            .await
            .expect("skill should build")
    }

    async fn wait_registered(&self) {
        timeout(Duration::from_secs(2), async {
            while self.discovery.registrations().await.is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("skill should register");
    }
}

fn greet_payload() -> Data {
    Data {
        vendor: "acme".into(),
        skill: "greeter".into(),
        command: "greet".into(),
        query: "greet Sam".into(),
        text: "please greet Sam".into(),
        all_required_params_present: true,
        parameters: {
            let mut map = serde_json::Map::new();
            map.insert("name".into(), json!("Sam"));
            map
        },
        output_contexts: vec![OutputContext {
            name: "greeting-followup".into(),
            lifespan: 2,
        }],
    }
}

#[tokio::test]
async fn trigger_round_trip_reaches_the_handler_and_speaks() {
    let harness = Harness::new();
    let mut skill = harness.skill().await;
    let topic = skill.identity().topic("greet");

    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel::<Data>();
    skill
        .add_handler("greet", move |ctx| {
            let seen = seen_tx.clone();
            async move {
                if let Some(express) = &ctx.express {
                    let name = ctx
                        .data
                        .parameter("name")
                        .and_then(|v| v.as_str())
                        .unwrap_or("friend");
                    express.talk(format!("Hello, {name}!")).await;
                }
                let _ = seen.send(ctx.data);
            }
        })
        .await
        .unwrap();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let run = tokio::spawn(skill.run_until(async move {
        let _ = stop_rx.await;
    }));

    let express_channel = harness.discovery.set_online(EXPRESSION_SERVICE).await;
    harness.wait_registered().await;

    let sent = greet_payload();
    let message = harness
        .broker
        .publish(&topic, serde_json::to_vec(&sent).unwrap())
        .await;
    assert!(message.is_acked(), "messages are acked at receipt");

    let received = timeout(Duration::from_secs(2), seen_rx.recv())
        .await
        .expect("handler should be invoked")
        .unwrap();
    assert_eq!(received, sent);

    let sentences = express_channel.sentences().await;
    assert_eq!(sentences.len(), 1);
    assert_eq!(sentences[0].value, "Hello, Sam!");
    assert!(!sentences[0].broadcast);

    let _ = stop_tx.send(());
    timeout(Duration::from_secs(2), run)
        .await
        .expect("run should stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn malformed_payload_does_not_stop_the_skill() {
    let harness = Harness::new();
    let mut skill = harness.skill().await;
    let topic = skill.identity().topic("greet");

    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel::<String>();
    skill
        .add_handler("greet", move |ctx| {
            let seen = seen_tx.clone();
            async move {
                let _ = seen.send(ctx.data.command);
            }
        })
        .await
        .unwrap();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let run = tokio::spawn(skill.run_until(async move {
        let _ = stop_rx.await;
    }));
    harness.discovery.set_online(EXPRESSION_SERVICE).await;
    harness.wait_registered().await;

    harness.broker.publish(&topic, b"definitely not json".to_vec()).await;
    harness
        .broker
        .publish(&topic, serde_json::to_vec(&greet_payload()).unwrap())
        .await;

    let command = timeout(Duration::from_secs(2), seen_rx.recv())
        .await
        .expect("loop should survive the malformed payload")
        .unwrap();
    assert_eq!(command, "greet");
    assert!(seen_rx.try_recv().is_err(), "the bad payload never reaches a handler");

    let _ = stop_tx.send(());
    timeout(Duration::from_secs(2), run)
        .await
        .expect("run should stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn config_changes_reach_the_callback() {
    let harness = Harness::new();
    let mut skill = harness.skill().await;

    let config = skill.with_config(json!({"greeting": "Hello"})).await.unwrap();
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    skill.on_config_update(move |change| {
        let _ = seen_tx.send(change.clone());
    });

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let run = tokio::spawn(skill.run_until(async move {
        let _ = stop_rx.await;
    }));
    harness.discovery.set_online(EXPRESSION_SERVICE).await;
    harness.wait_registered().await;

    config.set("greeting", json!("Howdy")).await.unwrap();

    let change = timeout(Duration::from_secs(2), seen_rx.recv())
        .await
        .expect("config callback should fire")
        .unwrap();
    assert_eq!(change.key, "skill/acme/greeter/greeting");
    assert_eq!(change.value, json!("Howdy"));

    let _ = stop_tx.send(());
    timeout(Duration::from_secs(2), run)
        .await
        .expect("run should stop")
        .unwrap()
        .unwrap();
}

/// A discovery backend whose registration always fails.
struct RejectingDiscovery;

#[async_trait]
impl Discovery for RejectingDiscovery {
    async fn watch_dependencies(
        &self,
        _names: &[String],
    ) -> SkillResult<mpsc::UnboundedReceiver<String>> {
        let (_tx, rx) = mpsc::unbounded_channel();
        Ok(rx)
    }

    async fn register(&self, _registration: Registration) -> SkillResult<()> {
        Err(Error::Discovery("instance quota exceeded".into()))
    }

    async fn get_connection(&self, _name: &str) -> Option<Connection> {
        None
    }
}

#[tokio::test]
async fn registration_failure_is_fatal() {
    let skill = Skill::builder("acme", "greeter", "1.0.0")
        .transport(Arc::new(MemoryBroker::new()))
        .discovery(Arc::new(RejectingDiscovery))
        .dependencies(Vec::<String>::new())
        .build()
        .await
        .unwrap();

    let result = timeout(
        Duration::from_secs(2),
        skill.run_until(std::future::pending::<()>()),
    )
        .await
        .expect("run should fail fast on registration errors");
    assert!(matches!(result, Err(Error::Registration(_))));
}
