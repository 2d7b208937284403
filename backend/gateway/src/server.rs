//! Gateway server: shared state and the route table.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::time::Instant;

use cligate_core::Engine;
use cligate_session::SessionStore;

use crate::health_api;
use crate::openai_compat;

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub engine: Arc<dyn Engine>,
    pub sessions: SessionStore,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(engine: Arc<dyn Engine>, sessions: SessionStore) -> Self {
        Self {
            engine,
            sessions,
            started_at: Instant::now(),
        }
    }
}

/// Build the route table. The binary layers CORS/trace on top and owns the
/// serve loop; tests drive handlers straight off the router.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route(
            "/v1/chat/completions",
            post(openai_compat::chat_completions),
        )
        .route("/v1/models", get(openai_compat::list_models))
        .route("/v1/models/:model_id", get(openai_compat::get_model))
        .route("/health", get(health_api::get_health))
        .with_state(state)
}
