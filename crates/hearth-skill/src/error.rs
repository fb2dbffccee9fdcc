//! Error types for the skill runtime.

use thiserror::Error;

/// Errors that can occur while building or running a skill.
#[derive(Error, Debug)]
pub enum Error {
    /// Discovery backend error during construction or a watch.
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Registering the skill instance with the discovery backend failed.
    #[error("Registration failed: {0}")]
    Registration(String),

    /// Pub/sub transport error.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration store error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A payload could not be decoded.
    #[error("Payload decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Internal channel error.
    #[error("Channel error: {0}")]
    Channel(String),

    /// OS signal handling could not be installed.
    #[error("Signal handling error: {0}")]
    Signal(String),

    /// Logging setup error.
    #[error("Logging error: {0}")]
    Logging(String),
}

/// Result type for skill runtime operations.
pub type Result<T> = std::result::Result<T, Error>;
