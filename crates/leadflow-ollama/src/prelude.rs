//! Prelude module for leadflow-ollama.

pub use crate::client::{OllamaClient, OllamaConfig};
pub use crate::error::{Error, Result};
pub use crate::model::LanguageModel;
