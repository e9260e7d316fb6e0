use std::sync::Arc;

use ttsd_core::{RequestTracker, RestartCoordinator};

use crate::config::ServerConfig;
use crate::config_store::FileConfigProvider;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (accessed by middleware and handlers).
    pub config: Arc<ServerConfig>,
    /// Restart coordinator driving graceful restarts.
    pub coordinator: RestartCoordinator,
    /// In-flight request tracker; the same instance the coordinator drains.
    pub tracker: RequestTracker,
    /// Reloadable service configuration store.
    pub service_config: Arc<FileConfigProvider>,
}
