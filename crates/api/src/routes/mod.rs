pub mod health;
pub mod restart;
pub mod service_config;

use axum::middleware::from_fn_with_state;
use axum::Router;

use crate::middleware::track;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /restart/request      request a graceful restart (POST, admin)
/// /restart/cancel       cancel a preparing restart (POST, admin)
/// /restart/status       coordinator status (GET, admin)
/// /restart/history      recent restart attempts (GET, admin)
///
/// /config               active service configuration (GET, tracked)
/// ```
///
/// The restart surface is mounted outside the request-tracking layer on
/// purpose: status and cancel must stay reachable while a drain is
/// rejecting new work with 503.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/restart", restart::router())
        .merge(tracked_routes(state))
}

/// The request-tracked tree. Every route here counts as a unit of work for
/// the drain and is gated during a restart; hosts embedding this crate
/// merge their own work routes into it.
pub fn tracked_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(service_config::router())
        .layer(from_fn_with_state(state.clone(), track::track_requests))
}
