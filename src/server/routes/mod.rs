//! API routes and handlers.

mod cache;

pub use cache::MAX_TTL_SECS;

use axum::{
    Router,
    routing::get,
};

use super::state::AppState;

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/cache", get(cache::cache_health))
        .route(
            "/cache",
            get(cache::get_value)
                .post(cache::set_value)
                .delete(cache::delete_value),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}
