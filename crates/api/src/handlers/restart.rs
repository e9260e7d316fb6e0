//! Handlers for the restart admin endpoints.

use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use ttsd_core::{RestartAttempt, RestartRequest, RestartState, RestartStatus};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::auth::AdminToken;
use crate::response::DataResponse;
use crate::state::AppState;

/// Identity recorded when a request body does not name the caller.
const ANONYMOUS_USER: &str = "anonymous";

/// Default number of attempts returned by the history endpoint.
const DEFAULT_HISTORY_LIMIT: usize = 10;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /restart/request`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RestartRequestBody {
    /// Who is asking. Recorded on the attempt for the audit trail.
    pub user: Option<String>,
    /// Free-form reason, also recorded on the attempt.
    pub reason: Option<String>,
    /// Skip the drain wait and restart immediately.
    pub force: bool,
    /// Reload the service configuration from disk (default: true).
    pub reload_config: Option<bool>,
    /// Drain wait budget in seconds (default: server DRAIN_TIMEOUT_SECS).
    pub timeout_secs: Option<u64>,
}

/// Request body for `POST /restart/cancel`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CancelRequestBody {
    pub user: Option<String>,
}

/// Response payload for an accepted restart request.
#[derive(Debug, Serialize)]
pub struct RestartAccepted {
    pub attempt_id: Uuid,
    pub state: RestartState,
}

/// Response payload for a successful cancellation.
#[derive(Debug, Serialize)]
pub struct RestartCancelled {
    pub attempt_id: Uuid,
    pub state: RestartState,
}

/// Query parameters for the history endpoint.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/restart/request
///
/// Ask for a graceful restart. Returns 202 with the new attempt id; the
/// restart itself runs in the background and progress is observable via
/// the status and history endpoints. 409 if an attempt is already running.
pub async fn request_restart(
    State(state): State<AppState>,
    _admin: AdminToken,
    Json(body): Json<RestartRequestBody>,
) -> AppResult<(StatusCode, Json<DataResponse<RestartAccepted>>)> {
    let timeout_secs = body.timeout_secs.unwrap_or(state.config.drain_timeout_secs);
    let request = RestartRequest::new(
        body.user.as_deref().unwrap_or(ANONYMOUS_USER),
        body.reason.unwrap_or_default(),
        body.force,
        body.reload_config.unwrap_or(true),
        Duration::from_secs(timeout_secs),
    )?;

    let attempt_id = state.coordinator.request_restart(request)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: RestartAccepted {
                attempt_id,
                state: state.coordinator.state(),
            },
        }),
    ))
}

/// POST /api/v1/restart/cancel
///
/// Cancel the attempt currently preparing. 409 once draining has begun or
/// when nothing is in progress.
pub async fn cancel_restart(
    State(state): State<AppState>,
    _admin: AdminToken,
    Json(body): Json<CancelRequestBody>,
) -> AppResult<Json<DataResponse<RestartCancelled>>> {
    let user = body.user.as_deref().unwrap_or(ANONYMOUS_USER);
    let attempt_id = state.coordinator.cancel_restart(user)?;

    Ok(Json(DataResponse {
        data: RestartCancelled {
            attempt_id,
            state: state.coordinator.state(),
        },
    }))
}

/// GET /api/v1/restart/status
pub async fn get_status(
    State(state): State<AppState>,
    _admin: AdminToken,
) -> Json<DataResponse<RestartStatus>> {
    Json(DataResponse {
        data: state.coordinator.status(),
    })
}

/// GET /api/v1/restart/history?limit=10
///
/// Most recent attempts first. The limit is capped by the ring capacity.
pub async fn get_history(
    State(state): State<AppState>,
    _admin: AdminToken,
    Query(query): Query<HistoryQuery>,
) -> Json<DataResponse<Vec<RestartAttempt>>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Json(DataResponse {
        data: state.coordinator.history(limit),
    })
}
