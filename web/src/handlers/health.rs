//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

/// Simple health check endpoint (for basic liveness).
///
/// Returns 200 OK to indicate the service is running.
/// This endpoint does NOT check collaborators.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Readiness report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Readiness {
    /// Always `"ready"` when the broker answers
    pub status: &'static str,
    /// Live event stream connections
    pub subscribers: usize,
}

/// Readiness check that round-trips through the event broker.
///
/// # Endpoint
///
/// ```text
/// GET /ready
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "ready",
///   "subscribers": 3
/// }
/// ```
pub async fn readiness(State(state): State<AppState>) -> Json<Readiness> {
    let subscribers = state.broker.subscriber_count().await;
    Json(Readiness {
        status: "ready",
        subscribers,
    })
}
