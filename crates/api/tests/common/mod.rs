use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use ttsd_core::{ConfigProvider, CallbackRegistry, RequestTracker, RestartCoordinator, RestartState};

use ttsd_api::config::ServerConfig;
use ttsd_api::config_store::FileConfigProvider;
use ttsd_api::routes;
use ttsd_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default),
/// a 30-second request timeout, and no admin token.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        drain_timeout_secs: 30,
        restart_history_capacity: 50,
        service_config_path: "config.json".to_string(),
        admin_token: None,
    }
}

/// A fully wired test application.
///
/// Keeps the `AppState` next to the router so tests can reach the tracker
/// and coordinator directly, and owns the temp directory backing the
/// service configuration file so it outlives the test.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub config_path: PathBuf,
    _config_dir: TempDir,
}

impl TestApp {
    /// A fresh clone of the router for a single `oneshot` call.
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Wait until the coordinator settles back to idle.
    pub async fn wait_until_idle(&self) {
        let mut status = self.state.coordinator.watch_status();
        status
            .wait_for(|s| s.state == RestartState::Idle)
            .await
            .expect("coordinator status channel closed");
    }
}

/// Build the full application with default configuration and no hooks.
pub async fn build_test_app() -> TestApp {
    build_app(|_| {}, CallbackRegistry::new()).await
}

/// Build the full application with an adjusted `ServerConfig`.
pub async fn build_test_app_with(adjust: impl FnOnce(&mut ServerConfig)) -> TestApp {
    build_app(adjust, CallbackRegistry::new()).await
}

/// Build the full application with restart hooks registered.
pub async fn build_test_app_with_hooks(hooks: CallbackRegistry) -> TestApp {
    build_app(|_| {}, hooks).await
}

/// Build the full application router with all middleware layers.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack (CORS, request ID, timeout, tracing,
/// panic recovery) that production uses.
async fn build_app(adjust: impl FnOnce(&mut ServerConfig), hooks: CallbackRegistry) -> TestApp {
    let config_dir = tempfile::tempdir().expect("failed to create temp dir");
    let config_path = config_dir.path().join("config.json");

    let mut config = test_config();
    config.service_config_path = config_path.to_string_lossy().into_owned();
    adjust(&mut config);

    let service_config = Arc::new(
        FileConfigProvider::load_or_init(&config.service_config_path)
            .await
            .expect("failed to initialize service configuration"),
    );

    let tracker = RequestTracker::new();
    let coordinator = RestartCoordinator::builder(tracker.clone())
        .hooks(hooks)
        .config_provider(Arc::clone(&service_config) as Arc<dyn ConfigProvider>)
        .history_capacity(config.restart_history_capacity)
        .build();

    let state = AppState {
        config: Arc::new(config),
        coordinator,
        tracker,
        service_config,
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    let router = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes(&state))
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state.clone());

    TestApp {
        router,
        state,
        config_path,
        _config_dir: config_dir,
    }
}

/// Issue a GET request against the app.
pub async fn get(app: Router, path: &str) -> Response {
    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

/// Issue a GET request with an `Authorization` header.
pub async fn get_with_auth(app: Router, path: &str, authorization: &str) -> Response {
    let request = Request::builder()
        .uri(path)
        .header(AUTHORIZATION, authorization)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Issue a POST request with a JSON body.
pub async fn post_json(app: Router, path: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Issue a POST request with a JSON body and an `Authorization` header.
pub async fn post_json_with_auth(
    app: Router,
    path: &str,
    body: serde_json::Value,
    authorization: &str,
) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(CONTENT_TYPE, "application/json")
        .header(AUTHORIZATION, authorization)
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Read a response body to completion and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
