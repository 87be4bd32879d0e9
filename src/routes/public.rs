use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that are reachable without an `Authorization` header.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers and monitoring.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/register
        .route("/auth/register", post(handlers::register_user))
        // POST /auth/login
        // Verifies credentials and returns a signed, time-limited access token.
        .route("/auth/login", post(handlers::login_user))
}
