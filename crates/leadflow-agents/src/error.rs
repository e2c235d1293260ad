//! Error types for leadflow-agents.

use thiserror::Error;

/// Error type for agent runs and calculators.
#[derive(Error, Debug)]
pub enum Error {
    /// No agent is registered under the requested name.
    #[error("Agent '{0}' is not registered")]
    UnknownAgent(String),

    /// Calculator input failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The record store could not be read.
    #[error(transparent)]
    Store(#[from] leadflow_airtable::Error),

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create an input validation error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Result type alias for leadflow-agents operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
