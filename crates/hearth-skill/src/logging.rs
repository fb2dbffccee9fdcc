//! Logging setup for skill binaries.

use crate::error::{Error, Result};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Initialize process-wide logging.
///
/// Respects `RUST_LOG`, defaulting to `info`. Fails if a global
/// subscriber was already installed.
pub fn init(skill_name: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()
        .map_err(|err| Error::Logging(err.to_string()))?;
    debug!(skill = skill_name, "logging initialized");
    Ok(())
}
