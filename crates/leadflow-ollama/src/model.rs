//! Language model abstraction.

use async_trait::async_trait;

use crate::Result;

/// A text-in, text-out language model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generates a completion for the prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Name of the model answering prompts, for logging.
    fn model_name(&self) -> &str;
}
