#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod server;

use std::process;

use anyhow::Context;
use axum::Router;
use leadflow_server::handler::routes;
use leadflow_server::middleware::{RecoveryConfig, RouterObservabilityExt, RouterRecoveryExt};
use leadflow_server::service::ServiceState;
use leadflow_server::worker::AgentScheduler;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Cli;

// Tracing target constants
pub const TRACING_TARGET_SERVER_STARTUP: &str = "leadflow_cli::server::startup";
pub const TRACING_TARGET_SERVER_SHUTDOWN: &str = "leadflow_cli::server::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "leadflow_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            "Application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = %error,
            "Application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();
    Cli::init_tracing();

    cli.log();
    cli.validate()?;

    let shutdown = CancellationToken::new();
    let state = ServiceState::from_config(&cli.service)
        .context("failed to create service state")?
        .with_shutdown(shutdown.clone());

    let scheduler = spawn_scheduler(&cli, &state, &shutdown);
    let router = create_router(state, &cli.recovery);

    let result = server::serve(router, cli.server, shutdown.clone()).await;

    shutdown.cancel();
    if let Some(scheduler) = scheduler
        && let Err(error) = scheduler.await
    {
        tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = %error,
            "Agent scheduler task failed"
        );
    }

    result.context("http server failed")
}

/// Starts the agent scheduler when at least one agent is scheduled.
fn spawn_scheduler(
    cli: &Cli,
    state: &ServiceState,
    shutdown: &CancellationToken,
) -> Option<JoinHandle<()>> {
    if cli.scheduler.is_empty() {
        tracing::debug!(
            target: TRACING_TARGET_SERVER_STARTUP,
            "No agents scheduled"
        );
        return None;
    }

    let scheduler = AgentScheduler::new(state.runner().clone(), cli.scheduler.clone());
    Some(tokio::spawn(scheduler.run(shutdown.clone())))
}

/// Creates the router with all middleware layers applied.
///
/// Middleware is applied in reverse order (last added = outermost):
/// 1. Recovery (outermost) - catches panics and enforces timeouts
/// 2. Observability - request tracing with redacted headers
/// 3. Routes (innermost) - actual request handlers
fn create_router(state: ServiceState, recovery: &RecoveryConfig) -> Router {
    routes(state).with_observability().with_recovery(recovery)
}
