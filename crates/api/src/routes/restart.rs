//! Route definitions for the restart admin endpoints.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::restart;
use crate::state::AppState;

/// Admin routes mounted at `/api/v1/restart`.
///
/// ```text
/// POST /request   -> request_restart
/// POST /cancel    -> cancel_restart
/// GET  /status    -> get_status
/// GET  /history   -> get_history
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/request", post(restart::request_restart))
        .route("/cancel", post(restart::cancel_restart))
        .route("/status", get(restart::get_status))
        .route("/history", get(restart::get_history))
}
