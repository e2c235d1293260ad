//! Deal calculator handlers.

use axum::Router;
use axum::extract::State;
use axum::routing::post;
use leadflow_agents::calculator::{
    Assessment, CashOfferInput, CashOfferMetadata, MultifamilyInput, MultifamilyMetadata, Weights,
    cash_offer_range, multifamily_score,
};

use crate::extract::Json;
use crate::handler::Result;
use crate::service::ServiceState;

/// Tracing target for calculator routes.
const TRACING_TARGET: &str = "leadflow_server::handler::calculators";

async fn cash_offer(
    State(weights): State<Weights>,
    Json(input): Json<CashOfferInput>,
) -> Result<Json<Assessment<CashOfferMetadata>>> {
    let assessment = cash_offer_range(&input, &weights.cash_offer)?;

    tracing::debug!(
        target: TRACING_TARGET,
        lead_id = ?input.lead_id,
        offer_low = assessment.metadata.offer_low,
        offer_high = assessment.metadata.offer_high,
        "Cash offer computed"
    );

    Ok(Json(assessment))
}

async fn multifamily(
    State(weights): State<Weights>,
    Json(input): Json<MultifamilyInput>,
) -> Result<Json<Assessment<MultifamilyMetadata>>> {
    let assessment = multifamily_score(&input, &weights.multifamily)?;

    tracing::debug!(
        target: TRACING_TARGET,
        property_id = ?input.property_id,
        score = assessment.score,
        "Multifamily score computed"
    );

    Ok(Json(assessment))
}

/// Returns a [`Router`] with the calculator routes.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/ai/cash-offer", post(cash_offer))
        .route("/ai/multifamily-score", post(multifamily))
}
