use std::path::PathBuf;
use std::sync::Arc;

#[cfg(feature = "config")]
use clap::Args;
use leadflow_agents::calculator::Weights;
use leadflow_agents::{AgentRunner, OfferAgentConfig, PropertySchema, ScoreAgentConfig};
use leadflow_airtable::{AirtableClient, AirtableConfig};
use leadflow_ollama::{OllamaClient, OllamaConfig};
use serde::{Deserialize, Serialize};

use crate::{Result, TRACING_TARGET};

/// App [`state`] configuration.
///
/// [`state`]: crate::service::ServiceState
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct ServiceConfig {
    /// Record store connection.
    #[cfg_attr(feature = "config", command(flatten))]
    pub airtable: AirtableConfig,

    /// Language model used by the score agent.
    #[cfg_attr(feature = "config", command(flatten))]
    pub ollama: OllamaConfig,

    /// Properties table layout.
    #[cfg_attr(feature = "config", command(flatten))]
    pub schema: PropertySchema,

    #[cfg_attr(feature = "config", command(flatten))]
    pub score: ScoreAgentConfig,

    #[cfg_attr(feature = "config", command(flatten))]
    pub offer: OfferAgentConfig,

    /// JSON file overriding the calculator weights.
    #[cfg_attr(feature = "config", arg(long = "weights-path", env = "WEIGHTS_PATH"))]
    #[serde(default)]
    pub weights_path: Option<PathBuf>,
}

impl ServiceConfig {
    /// Creates a configuration with default agents for the given store and model.
    pub fn new(airtable: AirtableConfig, ollama: OllamaConfig) -> Self {
        Self {
            airtable,
            ollama,
            schema: PropertySchema::default(),
            score: ScoreAgentConfig::default(),
            offer: OfferAgentConfig::default(),
            weights_path: None,
        }
    }

    /// Checks every section that can be checked without connecting.
    pub fn validate(&self) -> Result<()> {
        self.airtable.validate()?;
        self.ollama.validate()?;
        self.schema.validate()?;
        self.score.validate()?;
        self.offer.validate()?;
        Ok(())
    }

    /// Creates the record store client.
    pub fn connect_airtable(&self) -> Result<AirtableClient> {
        Ok(AirtableClient::new(self.airtable.clone())?)
    }

    /// Creates the language model client.
    pub fn connect_ollama(&self) -> Result<OllamaClient> {
        Ok(OllamaClient::new(self.ollama.clone())?)
    }

    /// Builds the agent runner on top of fresh clients.
    pub fn create_runner(&self) -> Result<AgentRunner> {
        Ok(AgentRunner::new(
            Arc::new(self.connect_airtable()?),
            Arc::new(self.connect_ollama()?),
            self.schema.clone(),
            self.score.clone(),
            self.offer.clone(),
        ))
    }

    /// Loads the calculator weights, falling back to the defaults.
    pub fn load_weights(&self) -> Result<Weights> {
        let Some(path) = &self.weights_path else {
            return Ok(Weights::default());
        };
        let weights = Weights::from_file(path)?;
        tracing::info!(
            target: TRACING_TARGET,
            path = %path.display(),
            "Loaded calculator weights"
        );
        Ok(weights)
    }
}
