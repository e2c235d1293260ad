//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── server: ServerConfig         # Host, port, shutdown
//! ├── recovery: RecoveryConfig     # Request timeout
//! ├── service: ServiceConfig       # Airtable, Ollama, agents, weights
//! └── scheduler: SchedulerConfig   # Periodic agent runs
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.
//!
//! # Example
//!
//! ```bash
//! leadflow --airtable-base-id appXXXXXXXXXXXXXX --port 8000
//!
//! AIRTABLE_BASE_ID=appXXXXXXXXXXXXXX PORT=8000 AGENT_SCHEDULE=score:60 leadflow
//! ```

mod server;

use std::process;

use anyhow::Context;
use clap::Parser;
use leadflow_server::middleware::RecoveryConfig;
use leadflow_server::service::ServiceConfig;
use leadflow_server::worker::SchedulerConfig;
use serde::{Deserialize, Serialize};
pub use server::ServerConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_SERVER_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "leadflow")]
#[command(about = "Lead scoring and offer pricing server")]
#[command(version)]
pub struct Cli {
    /// Server network and lifecycle configuration.
    #[clap(flatten)]
    pub server: ServerConfig,

    /// Panic and timeout recovery.
    #[clap(flatten)]
    pub recovery: RecoveryConfig,

    /// Record store, language model and agent configuration.
    #[clap(flatten)]
    pub service: ServiceConfig,

    /// Periodic agent runs.
    #[clap(flatten)]
    pub scheduler: SchedulerConfig,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is read before clap runs so its values act as `env` defaults.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with environment-based filtering.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    fn log_build_info() {
        tracing::info!(
            target: TRACING_TARGET_SERVER_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            "Starting leadflow server"
        );
        tracing::debug!(
            target: TRACING_TARGET_SERVER_STARTUP,
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );
    }

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.server
            .validate()
            .context("invalid server configuration")?;
        self.service
            .validate()
            .context("invalid service configuration")?;
        Ok(())
    }

    /// Logs configuration (no secrets).
    pub fn log(&self) {
        Self::log_build_info();
        self.server.log();

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            base_id = %self.service.airtable.base_id,
            api_key_set = !self.service.airtable.api_key.is_empty(),
            max_attempts = self.service.airtable.max_attempts,
            page_size = self.service.airtable.page_size,
            batch_size = self.service.airtable.batch_size,
            "Airtable configuration"
        );
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            url = %self.service.ollama.base_url,
            model = %self.service.ollama.model,
            "Ollama configuration"
        );
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            table = %self.service.schema.table,
            offer_threshold = self.service.offer.threshold,
            offer_margin = self.service.offer.margin,
            request_timeout_secs = self.recovery.request_timeout,
            schedule = ?self.scheduler.schedule.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "Agent configuration"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}
