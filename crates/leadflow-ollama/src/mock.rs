//! Scripted language model for tests.
//!
//! This module is only available when the `test-utils` feature is enabled.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::{Error, LanguageModel, Result};

#[derive(Debug, Default)]
struct MockState {
    replies: VecDeque<Result<String>>,
    fallback: Option<String>,
    prompts: Vec<String>,
}

/// Language model replaying scripted replies.
///
/// Replies are consumed in order; once exhausted the fallback reply is
/// returned, or an API error if none is set. Clones share their state.
#[derive(Debug, Clone, Default)]
pub struct MockModel {
    state: Arc<Mutex<MockState>>,
}

impl MockModel {
    /// Creates a model answering every prompt with `reply`.
    pub fn always(reply: impl Into<String>) -> Self {
        let model = Self::default();
        model.lock().fallback = Some(reply.into());
        model
    }

    /// Creates a model replaying `replies` in order.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let model = Self::default();
        model
            .lock()
            .replies
            .extend(replies.into_iter().map(|reply| Ok(reply.into())));
        model
    }

    /// Queues a failing reply.
    pub fn push_error(&self, status: u16, message: impl Into<String>) {
        self.lock()
            .replies
            .push_back(Err(Error::api_error(status, message)));
    }

    /// Returns every prompt received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.lock().prompts.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let mut state = self.lock();
        state.prompts.push(prompt.to_owned());
        match state.replies.pop_front() {
            Some(reply) => reply,
            None => state
                .fallback
                .clone()
                .ok_or_else(|| Error::api_error(503, "mock model has no reply")),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_then_fallback() {
        let model = MockModel::with_replies(["42"]);
        model.push_error(500, "boom");

        assert_eq!(model.generate("a").await.unwrap(), "42");
        assert!(model.generate("b").await.is_err());
        assert!(model.generate("c").await.is_err());
        assert_eq!(model.prompts(), vec!["a", "b", "c"]);

        let always = MockModel::always("77");
        assert_eq!(always.generate("x").await.unwrap(), "77");
        assert_eq!(always.generate("y").await.unwrap(), "77");
    }
}
