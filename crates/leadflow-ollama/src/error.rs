//! Error types for leadflow-ollama.

use thiserror::Error;

/// Error type for the leadflow-ollama library.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport errors from reqwest, including timeouts.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status or an error body.
    #[error("Ollama API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The response body was not a generate response.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an API error.
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Returns `true` if the request timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(err) if err.is_timeout())
    }
}

/// Result type alias for leadflow-ollama operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
