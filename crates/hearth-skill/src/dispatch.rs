//! The single-consumer dispatch loop.
//!
//! All updates, whatever their producer, are drained here one at a time.
//! Handlers and the config callback therefore never run concurrently with
//! each other; a slow handler delays every update queued behind it.

use crate::express::{Express, EXPRESSION_SERVICE};
use crate::payload::Data;
use crate::traits::{ConfigChange, Discovery, TriggerMessage};
use crate::update::{Update, UpdateReceiver};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Boxed command handler stored in the registry.
pub type HandlerFn = Box<dyn Fn(TriggerContext) -> BoxFuture<'static, ()> + Send + Sync>;

/// Callback invoked on the dispatch loop for each configuration change.
pub type ConfigUpdateFn = Box<dyn Fn(&ConfigChange) + Send + Sync>;

/// Everything a command handler receives for one trigger.
#[derive(Debug)]
pub struct TriggerContext {
    /// Decoded command data.
    pub data: Data,
    /// Outbound speech client, present once the expression service has
    /// been observed online.
    pub express: Option<Express>,
}

/// Box a handler closure into the registry's stored form.
pub(crate) fn handler_fn<F, Fut>(handler: F) -> HandlerFn
where
    F: Fn(TriggerContext) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    Box::new(move |ctx| Box::pin(handler(ctx)))
}

/// The dispatch loop. Owns the handler registry and the lazily-built
/// expression client; nothing else touches either once the loop runs.
pub(crate) struct Dispatcher {
    updates: UpdateReceiver,
    cancel: CancellationToken,
    handlers: HashMap<String, HandlerFn>,
    on_config_update: Option<ConfigUpdateFn>,
    discovery: Arc<dyn Discovery>,
    express: Option<Express>,
}

impl Dispatcher {
    pub(crate) fn new(
        updates: UpdateReceiver,
        cancel: CancellationToken,
        handlers: HashMap<String, HandlerFn>,
        on_config_update: Option<ConfigUpdateFn>,
        discovery: Arc<dyn Discovery>,
    ) -> Self {
        Self {
            updates,
            cancel,
            handlers,
            on_config_update,
            discovery,
            express: None,
        }
    }

    /// Drain the queue until cancellation. Updates still queued when the
    /// token fires are dropped, not drained.
    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                maybe_update = self.updates.recv() => match maybe_update {
                    Some(update) => self.handle(update).await,
                    // Queue close races shutdown and only follows cancellation.
                    None => break,
                },
            }
        }
        self.updates.close();
        debug!("dispatch loop stopped");
    }

    async fn handle(&mut self, update: Update) {
        match update {
            Update::Config(change) => {
                if let Some(on_config_update) = &self.on_config_update {
                    on_config_update(&change);
                }
            }
            Update::Dependency(name) => self.handle_dependency(&name).await,
            Update::Trigger(message) => self.handle_trigger(message).await,
        }
    }

    /// The expression service carries the outbound speech capability; its
    /// client is rebuilt on every (re)connection. Other dependencies are
    /// only observed.
    async fn handle_dependency(&mut self, name: &str) {
        if name != EXPRESSION_SERVICE {
            debug!(dependency = name, "dependency online");
            return;
        }
        match self.discovery.get_connection(name).await {
            Some(conn) => {
                self.express = Some(Express::new(conn));
                info!("expression client created");
            }
            None => warn!(
                dependency = name,
                "dependency reported online but no connection is available"
            ),
        }
    }

    async fn handle_trigger(&mut self, message: TriggerMessage) {
        let Some(handler) = self.handlers.get(message.topic()) else {
            debug!(topic = message.topic(), "no handler registered for topic");
            return;
        };
        let data = match Data::decode(message.payload()) {
            Ok(data) => data,
            Err(err) => {
                // A bad payload costs that update, never the loop.
                warn!(
                    topic = message.topic(),
                    error = %err,
                    "dropping trigger with undecodable payload"
                );
                return;
            }
        };

        let span = info_span!("handle_trigger", command = %data.command);
        let invocation = handler(TriggerContext {
            data,
            express: self.express.clone(),
        });
        invocation.instrument(span).await;
    }
}
