//! Bridges a watched configuration namespace into the update queue.

use crate::error::Result;
use crate::traits::ConfigStore;
use crate::update::{Update, UpdateSender};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Forwards changes of one watched namespace as config updates.
pub(crate) struct ConfigSource;

impl ConfigSource {
    /// Start the watch and the forwarding task.
    pub(crate) async fn spawn(
        store: Arc<dyn ConfigStore>,
        prefix: &str,
        updates: UpdateSender,
        cancel: CancellationToken,
    ) -> Result<JoinHandle<()>> {
        let mut changes = store.watch(prefix).await?;
        let prefix = prefix.to_string();
        Ok(tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    maybe_change = changes.recv() => match maybe_change {
                        Some(change) => updates.send(Update::Config(change)),
                        None => break,
                    },
                }
            }
            debug!(prefix = %prefix, "config source stopped");
        }))
    }
}
