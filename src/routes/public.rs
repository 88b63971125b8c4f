use crate::AppState;
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints that skip the credential check.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Used by load balancers and container probes.
        .route("/health", get(|| async { "ok" }))
}
