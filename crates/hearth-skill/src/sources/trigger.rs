//! Bridges inbound pub/sub messages into the update queue.

use crate::error::Result;
use crate::traits::{MessageCallback, QoS, Transport, TriggerMessage};
use crate::update::{Update, UpdateSender};
use std::sync::Arc;

/// Subscribes to command topics and turns each delivery into a trigger
/// update.
///
/// Every message is acknowledged at receipt, before the dispatch loop sees
/// it. The transport considers it delivered even if handling fails later;
/// handling is at most once by design.
pub(crate) struct TriggerSource {
    transport: Arc<dyn Transport>,
    updates: UpdateSender,
}

impl TriggerSource {
    pub(crate) fn new(transport: Arc<dyn Transport>, updates: UpdateSender) -> Self {
        Self { transport, updates }
    }

    /// Subscribe to one fully-qualified topic.
    pub(crate) async fn subscribe(&self, topic: &str) -> Result<()> {
        let updates = self.updates.clone();
        let callback: MessageCallback = Arc::new(move |message: TriggerMessage| {
            message.ack();
            updates.send(Update::Trigger(message));
        });
        self.transport
            .subscribe(topic, QoS::AtLeastOnce, callback)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::MemoryBroker;
    use crate::update::update_queue;

    #[tokio::test]
    async fn deliveries_are_acked_and_queued() {
        let broker = Arc::new(MemoryBroker::new());
        let (tx, mut rx) = update_queue();
        let source = TriggerSource::new(broker.clone(), tx);

        source.subscribe("skill/acme/demo/run").await.unwrap();
        let message = broker.publish("skill/acme/demo/run", b"{}".to_vec()).await;

        assert!(message.is_acked());
        match rx.recv().await {
            Some(Update::Trigger(queued)) => {
                assert_eq!(queued.topic(), "skill/acme/demo/run");
                assert!(queued.is_acked());
            }
            other => panic!("unexpected update: {other:?}"),
        }
    }

    #[tokio::test]
    async fn deliveries_preserve_publish_order() {
        let broker = Arc::new(MemoryBroker::new());
        let (tx, mut rx) = update_queue();
        let source = TriggerSource::new(broker.clone(), tx);
        source.subscribe("skill/acme/demo/run").await.unwrap();

        broker.publish("skill/acme/demo/run", b"1".to_vec()).await;
        broker.publish("skill/acme/demo/run", b"2".to_vec()).await;

        for expected in [b"1".as_slice(), b"2".as_slice()] {
            match rx.recv().await {
                Some(Update::Trigger(queued)) => assert_eq!(queued.payload(), expected),
                other => panic!("unexpected update: {other:?}"),
            }
        }
    }
}
