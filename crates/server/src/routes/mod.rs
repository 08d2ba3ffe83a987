//! HTTP route handlers for the relay.
//!
//! # Route Structure
//!
//! ```text
//! POST    /        - Action entry point
//! OPTIONS /        - Preflight acknowledgment
//! *       /        - 405 Method not allowed
//! GET     /health  - Liveness check
//! ```

pub mod relay;
pub mod returns;

use axum::{
    Router,
    routing::{get, post},
};

use crate::error::RelayError;
use crate::state::AppState;

/// Create the relay router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(relay::relay)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route("/health", get(health))
}

/// Plain acknowledgment for `OPTIONS`.
async fn preflight() -> &'static str {
    "ok"
}

async fn method_not_allowed() -> RelayError {
    RelayError::MethodNotAllowed
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}
