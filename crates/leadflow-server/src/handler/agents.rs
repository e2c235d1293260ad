//! Agent run handlers.

use axum::Router;
use axum::extract::{Path, State};
use axum::routing::post;
use leadflow_agents::AgentSummary;

use super::request::RunAgentRequest;
use crate::extract::Json;
use crate::handler::Result;
use crate::service::ServiceState;

/// Tracing target for agent routes.
const TRACING_TARGET: &str = "leadflow_server::handler::agents";

#[tracing::instrument(skip_all, fields(agent = %agent_name))]
async fn run_agent(
    State(state): State<ServiceState>,
    Path(agent_name): Path<String>,
    request: Option<Json<RunAgentRequest>>,
) -> Result<Json<AgentSummary>> {
    let limit = match request {
        Some(Json(request)) => request.limit()?,
        None => None,
    };

    tracing::debug!(
        target: TRACING_TARGET,
        limit = ?limit,
        "Agent run requested"
    );

    let cancel = state.request_token();
    let summary = state.runner().run(&agent_name, limit, &cancel).await?;

    tracing::info!(
        target: TRACING_TARGET,
        agent = %summary.agent,
        processed = summary.processed,
        success = summary.success,
        failed = summary.failed,
        "Agent run completed"
    );

    Ok(Json(summary))
}

/// Returns a [`Router`] with the agent routes and their legacy alias.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/ai/run-agent/{agent_name}", post(run_agent))
        .route("/run-agent/{agent_name}", post(run_agent))
}
