//! The skill façade: construction, handler registration, and lifecycle.

use crate::dispatch::{handler_fn, ConfigUpdateFn, Dispatcher, HandlerFn, TriggerContext};
use crate::error::{Error, Result};
use crate::express::EXPRESSION_SERVICE;
use crate::identity::SkillIdentity;
use crate::readiness::ReadinessSignal;
use crate::sources::{ConfigSource, DependencySource, TriggerSource};
use crate::traits::{ConfigChange, ConfigStore, Discovery, Registration, Transport};
use crate::update::{update_queue, UpdateReceiver, UpdateSender};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How long shutdown waits for the dispatch loop and the sources.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Builder for a [`Skill`].
pub struct SkillBuilder {
    vendor: String,
    name: String,
    version: String,
    transport: Option<Arc<dyn Transport>>,
    discovery: Option<Arc<dyn Discovery>>,
    config_store: Option<Arc<dyn ConfigStore>>,
    dependencies: Vec<String>,
}

impl SkillBuilder {
    fn new(vendor: &str, name: &str, version: &str) -> Self {
        Self {
            vendor: vendor.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            transport: None,
            discovery: None,
            config_store: None,
            dependencies: vec![EXPRESSION_SERVICE.to_string()],
        }
    }

    /// Pub/sub transport carrying inbound triggers.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Discovery backend for dependency tracking and registration.
    pub fn discovery(mut self, discovery: Arc<dyn Discovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    /// Configuration store backing [`Skill::with_config`].
    pub fn config_store(mut self, config_store: Arc<dyn ConfigStore>) -> Self {
        self.config_store = Some(config_store);
        self
    }

    /// Replace the declared dependency set. Defaults to the expression
    /// service only.
    pub fn dependencies<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = names.into_iter().map(Into::into).collect();
        self
    }

    /// Build the skill. Fails if a required backend is missing or the
    /// dependency watch cannot be started.
    pub async fn build(self) -> Result<Skill> {
        let transport = self
            .transport
            .ok_or_else(|| Error::Transport("no transport configured".into()))?;
        let discovery = self
            .discovery
            .ok_or_else(|| Error::Discovery("no discovery backend configured".into()))?;

        let identity = SkillIdentity::new(self.vendor, self.name, self.version);
        let cancel = CancellationToken::new();
        let (updates, receiver) = update_queue();

        let (ready, dependency_task) = DependencySource::spawn(
            discovery.clone(),
            self.dependencies.clone(),
            updates.clone(),
            cancel.clone(),
        )
        .await?;

        let mut source_tasks = Vec::new();
        if let Some(task) = dependency_task {
            source_tasks.push(task);
        }

        debug!(skill = %identity, instance = identity.instance_id(), "skill built");
        Ok(Skill {
            trigger_source: TriggerSource::new(transport, updates.clone()),
            identity,
            cancel,
            updates,
            receiver: Some(receiver),
            handlers: HashMap::new(),
            on_config_update: None,
            discovery,
            config_store: self.config_store,
            dependencies: self.dependencies,
            ready,
            source_tasks,
        })
    }
}

/// A running unit of behavior: command handlers plus the lifecycle that
/// routes triggers, config changes, and dependency changes to them.
pub struct Skill {
    identity: SkillIdentity,
    cancel: CancellationToken,
    updates: UpdateSender,
    receiver: Option<UpdateReceiver>,
    handlers: HashMap<String, HandlerFn>,
    on_config_update: Option<ConfigUpdateFn>,
    trigger_source: TriggerSource,
    discovery: Arc<dyn Discovery>,
    config_store: Option<Arc<dyn ConfigStore>>,
    dependencies: Vec<String>,
    ready: ReadinessSignal,
    source_tasks: Vec<JoinHandle<()>>,
}

impl Skill {
    /// Start building a skill identified by vendor, name, and version.
    pub fn builder(vendor: &str, name: &str, version: &str) -> SkillBuilder {
        SkillBuilder::new(vendor, name, version)
    }

    /// This instance's identity.
    pub fn identity(&self) -> &SkillIdentity {
        &self.identity
    }

    /// Register a command handler and subscribe to its topic.
    ///
    /// The topic is `skill/<vendor>/<name>/<command>`. Registering the
    /// same command again replaces the previous handler. All handlers
    /// must be registered before [`Skill::run`].
    pub async fn add_handler<F, Fut>(&mut self, command: &str, handler: F) -> Result<()>
    where
        F: Fn(TriggerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let topic = self.identity.topic(command);
        self.handlers.insert(topic.clone(), handler_fn(handler));
        self.trigger_source.subscribe(&topic).await
    }

    /// Set the callback invoked on the dispatch loop for every
    /// configuration change. Without one, config updates are dropped
    /// silently.
    pub fn on_config_update<F>(&mut self, callback: F)
    where
        F: Fn(&ConfigChange) + Send + Sync + 'static,
    {
        self.on_config_update = Some(Box::new(callback));
    }

    /// Seed this skill's configuration namespace and start watching it.
    ///
    /// Existing values win over the provided defaults. Returns a handle
    /// for reads and writes under the namespace.
    pub async fn with_config(&mut self, initial: Value) -> Result<ConfigHandle> {
        let store = self
            .config_store
            .clone()
            .ok_or_else(|| Error::Config("no config store configured".into()))?;
        let prefix = self.identity.config_prefix();

        store.seed(&prefix, initial).await?;
        let task = ConfigSource::spawn(
            store.clone(),
            &prefix,
            self.updates.clone(),
            self.cancel.clone(),
        )
        .await?;
        self.source_tasks.push(task);

        Ok(ConfigHandle { store, prefix })
    }

    /// Run until the process receives SIGINT or SIGTERM.
    ///
    /// Starts the dispatch loop, waits for all declared dependencies to be
    /// online, registers this instance with discovery, then serves until a
    /// signal arrives. Meant to be called exactly once.
    pub async fn run(self) -> Result<()> {
        let shutdown = shutdown_signal()?;
        self.run_until(shutdown).await
    }

    /// Like [`Skill::run`], but with a caller-supplied shutdown condition
    /// instead of OS signals.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let receiver = self
            .receiver
            .take()
            .ok_or_else(|| Error::Channel("skill was already run".into()))?;
        let handlers = std::mem::take(&mut self.handlers);
        let on_config_update = self.on_config_update.take();

        let dispatcher = Dispatcher::new(
            receiver,
            self.cancel.clone(),
            handlers,
            on_config_update,
            self.discovery.clone(),
        );
        let dispatch_task = tokio::spawn(dispatcher.run());
        tokio::pin!(shutdown);

        if !self.dependencies.is_empty() {
            info!("waiting for all dependencies to be online");
            tokio::select! {
                _ = self.ready.wait() => info!("all dependencies are online"),
                _ = &mut shutdown => {
                    info!("shutdown requested before dependencies were ready");
                    return self.finish(dispatch_task).await;
                }
            }
        }

        let registration = Registration {
            name: self.identity.name().to_string(),
            instance_id: self.identity.instance_id().to_string(),
            version: self.identity.version().to_string(),
            address: None,
        };
        if let Err(err) = self.discovery.register(registration).await {
            self.finish(dispatch_task).await?;
            return Err(Error::Registration(err.to_string()));
        }

        info!(skill = %self.identity.name(), "skill running");
        shutdown.await;
        self.finish(dispatch_task).await
    }

    /// Shutdown sequence: cancel, stop the sources, then the loop.
    async fn finish(mut self, dispatch_task: JoinHandle<()>) -> Result<()> {
        info!("shutting down");
        self.cancel.cancel();

        for task in self.source_tasks.drain(..) {
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, task).await.is_err() {
                warn!("source task did not stop within timeout");
            }
        }
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, dispatch_task).await {
            Ok(Ok(())) => debug!("dispatch loop stopped"),
            Ok(Err(err)) => warn!(error = %err, "dispatch task failed"),
            Err(_) => warn!("dispatch loop did not stop within timeout"),
        }
        Ok(())
    }
}

/// Typed access to one skill's configuration namespace.
#[derive(Clone)]
pub struct ConfigHandle {
    store: Arc<dyn ConfigStore>,
    prefix: String,
}

impl ConfigHandle {
    /// Read a key relative to the namespace.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.store.get(&self.qualify(key)).await
    }

    /// Write a key relative to the namespace.
    pub async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.store.set(&self.qualify(key), value).await
    }

    /// The namespace prefix this handle is bound to.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn qualify(&self, key: &str) -> String {
        format!("{}/{}", self.prefix, key)
    }
}

#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt =
        signal(SignalKind::interrupt()).map_err(|err| Error::Signal(err.to_string()))?;
    let mut terminate =
        signal(SignalKind::terminate()).map_err(|err| Error::Signal(err.to_string()))?;
    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => debug!("interrupt received"),
            _ = terminate.recv() => debug!("terminate received"),
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "ctrl-c listener failed");
        }
    })
}
