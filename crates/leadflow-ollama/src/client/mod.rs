//! Ollama client module.

mod ollama_client;
mod ollama_config;

pub use ollama_client::OllamaClient;
pub use ollama_config::OllamaConfig;
