//! Health check handler.

use axum::Router;
use axum::routing::get;

use super::response::HealthResponse;
use crate::extract::Json;
use crate::service::ServiceState;

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Returns a [`Router`] with the health route.
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/health", get(health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::test::create_test_server;

    #[tokio::test]
    async fn test_health() -> anyhow::Result<()> {
        let server = create_test_server()?;

        let response = server.get("/health").await;
        response.assert_status_ok();
        assert_eq!(response.json::<HealthResponse>(), HealthResponse::ok());

        Ok(())
    }
}
