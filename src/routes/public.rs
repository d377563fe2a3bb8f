use crate::AppState;
use axum::{Router, routing::get};

/// Public Router Module
///
/// Unauthenticated endpoints. Nothing here reads course data.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Returns "ok" immediately for load balancer checks.
        .route("/health", get(|| async { "ok" }))
}
