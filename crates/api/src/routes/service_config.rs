//! Route definitions for the service configuration endpoint.

use axum::routing::get;
use axum::Router;

use crate::handlers::service_config;
use crate::state::AppState;

/// Service routes, mounted inside the request-tracked tree.
///
/// ```text
/// GET /config  -> get_config
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/config", get(service_config::get_config))
}
