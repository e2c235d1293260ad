//! Ollama client configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Configuration for the Ollama client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct OllamaConfig {
    /// Ollama server URL (e.g., "http://localhost:11434")
    #[cfg_attr(
        feature = "config",
        arg(
            long = "ollama-url",
            env = "OLLAMA_URL",
            default_value = "http://localhost:11434"
        )
    )]
    #[serde(default = "default_base_url")]
    pub base_url: Url,

    /// Model used for generation (e.g., "mistral:7b", "llama3")
    #[cfg_attr(
        feature = "config",
        arg(long = "ollama-model", env = "OLLAMA_MODEL", default_value = "mistral:7b")
    )]
    #[serde(default = "default_model")]
    pub model: String,

    /// Request timeout in seconds
    #[cfg_attr(
        feature = "config",
        arg(
            id = "ollama_timeout_secs",
            long = "ollama-timeout-secs",
            env = "OLLAMA_TIMEOUT_SECS",
            default_value = "120"
        )
    )]
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> Url {
    Url::parse("http://localhost:11434").expect("Default URL should be valid")
}

fn default_model() -> String {
    "mistral:7b".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OllamaConfig {
    /// Set the server URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Set the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns the URL of the generate endpoint.
    pub fn generate_url(&self) -> Result<Url> {
        self.base_url
            .join("/api/generate")
            .map_err(|e| Error::invalid_config(format!("Invalid generate URL: {}", e)))
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::invalid_config("model must not be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(Error::invalid_config("timeout must be at least one second"));
        }
        self.generate_url().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OllamaConfig::default();
        assert_eq!(config.model, "mistral:7b");
        assert_eq!(config.timeout(), Duration::from_secs(120));
        assert_eq!(
            config.generate_url().unwrap().as_str(),
            "http://localhost:11434/api/generate"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = OllamaConfig::default()
            .with_base_url(Url::parse("http://gpu-box:11434/").unwrap())
            .with_model("llama3")
            .with_timeout(Duration::from_secs(30));

        assert_eq!(config.model, "llama3");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(
            config.generate_url().unwrap().as_str(),
            "http://gpu-box:11434/api/generate"
        );
    }

    #[test]
    fn test_validation() {
        assert!(OllamaConfig::default().with_model(" ").validate().is_err());
        assert!(
            OllamaConfig::default()
                .with_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
    }
}
