//! Liveness and readiness probe, mounted at the root.

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the project store is unreachable.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// Widget types the renderer can resolve.
    pub widget_types: usize,
}

/// GET /health
///
/// Always answers 200; a down store only degrades the status, since
/// rendering with inline global widgets still works without it.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = state.store.is_healthy().await;
    let widget_types = state.renderer.widget_renderer().registry().len();

    if !db_healthy {
        tracing::warn!("Health check: project store unreachable");
    }

    Json(HealthResponse {
        status: if db_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        widget_types,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
