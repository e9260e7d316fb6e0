use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use ttsd_core::RestartState;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Current restart lifecycle state.
    pub state: RestartState,
}

/// GET /health -- liveness plus the restart state.
///
/// Deliberately untracked so probes keep answering while a drain is in
/// progress. Reports "restarting" instead of flipping to unhealthy.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let restart_state = state.coordinator.state();
    let status = if restart_state == RestartState::Idle {
        "ok"
    } else {
        "restarting"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        state: restart_state,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
