//! Handlers for the service configuration endpoint.

use axum::extract::State;
use axum::Json;

use crate::config_store::ServiceConfig;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/config
///
/// The active service configuration. Served from memory; edits to the
/// file on disk take effect after a restart with `reload_config`.
pub async fn get_config(State(state): State<AppState>) -> Json<DataResponse<ServiceConfig>> {
    Json(DataResponse {
        data: state.service_config.current(),
    })
}
