//! Drain-aware request tracking middleware.

use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::state::AppState;

/// Response header carrying the time spent serving the request.
pub const RESPONSE_TIME_HEADER: &str = "x-response-time";

/// Track every request through the drain tracker.
///
/// While a restart is draining, new work is rejected with `503` and a
/// `SYSTEM_RESTARTING` code so clients know to retry shortly. Accepted
/// requests hold a tracker token for their full lifetime; the token is
/// released when the response is ready, or on drop if the handler
/// unwinds.
pub async fn track_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if state.tracker.is_draining() {
        let body = json!({
            "error": "Service is restarting, please retry shortly",
            "code": "SYSTEM_RESTARTING",
            "state": state.coordinator.state(),
        });
        return (StatusCode::SERVICE_UNAVAILABLE, axum::Json(body)).into_response();
    }

    let started = Instant::now();
    let token = state.tracker.begin();
    let mut response = next.run(request).await;
    token.release();

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    if let Ok(value) = HeaderValue::from_str(&format!("{elapsed_ms:.2}ms")) {
        response.headers_mut().insert(RESPONSE_TIME_HEADER, value);
    }
    response
}
