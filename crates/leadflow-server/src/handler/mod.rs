//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler

mod agents;
mod calculators;
mod error;
mod monitors;
pub mod request;
pub mod response;

use axum::Router;
use axum::response::{IntoResponse, Response};

pub use crate::handler::error::{Error, ErrorKind, ErrorResponse, Result};
use crate::service::ServiceState;

#[inline]
async fn fallback() -> Response {
    ErrorKind::NotFound.into_response()
}

/// Returns a [`Router`] with every route, bound to `state`.
pub fn routes(state: ServiceState) -> Router {
    Router::new()
        .merge(monitors::routes())
        .merge(agents::routes())
        .merge(calculators::routes())
        .fallback(fallback)
        .with_state(state)
}
