//! Named agent dispatch.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use leadflow_airtable::RecordStore;
use leadflow_ollama::LanguageModel;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{
    AgentSummary, Error, OfferAgent, OfferAgentConfig, PropertySchema, Result, ScoreAgent,
    ScoreAgentConfig, TRACING_TARGET,
};

/// Agents that can be run by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Score,
    Offer,
}

impl AgentKind {
    pub const ALL: [Self; 2] = [Self::Score, Self::Offer];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Score => "score",
            Self::Offer => "offer",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = Error;

    /// Accepts `score`, `score_agent`, `offer` and `offer_agent`, ignoring
    /// case and surrounding whitespace.
    fn from_str(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "score" | "score_agent" => Ok(Self::Score),
            "offer" | "offer_agent" => Ok(Self::Offer),
            _ => Err(Error::UnknownAgent(name.to_owned())),
        }
    }
}

/// Runs the registered agents by name.
#[derive(Debug, Clone)]
pub struct AgentRunner {
    score: ScoreAgent,
    offer: OfferAgent,
}

impl AgentRunner {
    pub fn new(
        store: Arc<dyn RecordStore>,
        model: Arc<dyn LanguageModel>,
        schema: PropertySchema,
        score_config: ScoreAgentConfig,
        offer_config: OfferAgentConfig,
    ) -> Self {
        Self {
            score: ScoreAgent::new(store.clone(), model, schema.clone(), score_config),
            offer: OfferAgent::new(store, schema, offer_config),
        }
    }

    /// Builds a runner from prepared agents.
    pub fn from_agents(score: ScoreAgent, offer: OfferAgent) -> Self {
        Self { score, offer }
    }

    /// Resolves `name` and runs the agent.
    pub async fn run(
        &self,
        name: &str,
        limit: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<AgentSummary> {
        let kind = name.parse::<AgentKind>()?;
        self.run_kind(kind, limit, cancel).await
    }

    pub async fn run_kind(
        &self,
        kind: AgentKind,
        limit: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<AgentSummary> {
        tracing::info!(
            target: TRACING_TARGET,
            agent = %kind,
            limit = ?limit,
            "Running agent"
        );
        match kind {
            AgentKind::Score => self.score.run(limit, cancel).await,
            AgentKind::Offer => self.offer.run(limit, cancel).await,
        }
    }
}
