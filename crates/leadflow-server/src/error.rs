//! Startup errors of the server crate.

use thiserror::Error;

/// Error raised while building the service state or the scheduler.
#[derive(Error, Debug)]
pub enum Error {
    /// The record store client could not be created.
    #[error("record store: {0}")]
    Airtable(#[from] leadflow_airtable::Error),

    /// The language model client could not be created.
    #[error("language model: {0}")]
    Ollama(#[from] leadflow_ollama::Error),

    /// Agent configuration is invalid.
    #[error(transparent)]
    Agents(#[from] leadflow_agents::Error),

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Result type alias for server startup operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
