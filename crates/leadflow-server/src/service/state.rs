//! Application state and dependency injection.

use leadflow_agents::AgentRunner;
use leadflow_agents::calculator::Weights;
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::service::ServiceConfig;

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Debug, Clone)]
pub struct ServiceState {
    runner: AgentRunner,
    weights: Weights,
    shutdown: CancellationToken,
}

impl ServiceState {
    /// Creates state from prepared parts.
    pub fn new(runner: AgentRunner, weights: Weights) -> Self {
        Self {
            runner,
            weights,
            shutdown: CancellationToken::new(),
        }
    }

    /// Initializes application state from configuration.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.create_runner()?, config.load_weights()?))
    }

    /// Ties in-flight agent runs to `shutdown`.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Returns a token for one request, cancelled on shutdown.
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    pub fn runner(&self) -> &AgentRunner {
        &self.runner
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

impl_di!(runner: AgentRunner);
impl_di!(weights: Weights);
