//! Watches dependency availability and feeds the readiness gate.

use crate::error::Result;
use crate::readiness::{ReadinessGate, ReadinessSignal};
use crate::traits::Discovery;
use crate::update::{Update, UpdateSender};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Forwards availability changes of the declared dependency set.
///
/// Each observation is pushed as a dependency update and recorded in the
/// readiness gate. The gate fires once all declared names have been seen.
pub(crate) struct DependencySource;

impl DependencySource {
    /// Start watching. An empty set needs no task; its gate is satisfied
    /// from the start.
    pub(crate) async fn spawn(
        discovery: Arc<dyn Discovery>,
        declared: Vec<String>,
        updates: UpdateSender,
        cancel: CancellationToken,
    ) -> Result<(ReadinessSignal, Option<JoinHandle<()>>)> {
        let mut gate = ReadinessGate::new(&declared);
        let signal = gate.signal();
        if declared.is_empty() {
            return Ok((signal, None));
        }

        let mut availability = discovery.watch_dependencies(&declared).await?;
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    maybe_name = availability.recv() => match maybe_name {
                        Some(name) => {
                            if gate.observe(&name) {
                                info!("all dependencies observed online");
                            }
                            updates.send(Update::Dependency(name));
                        }
                        None => break,
                    },
                }
            }
            debug!("dependency source stopped");
        });
        Ok((signal, Some(task)))
    }
}
