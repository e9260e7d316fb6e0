/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Default drain wait for restart requests that do not supply one,
    /// in seconds (default: `30`).
    pub drain_timeout_secs: u64,
    /// How many restart attempts the in-memory history retains
    /// (default: `50`).
    pub restart_history_capacity: usize,
    /// Path of the reloadable service configuration file
    /// (default: `config.json`).
    pub service_config_path: String,
    /// Bearer token required on the restart admin endpoints. When unset,
    /// the endpoints are open (local development only).
    pub admin_token: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                    |
    /// |----------------------------|----------------------------|
    /// | `HOST`                     | `0.0.0.0`                  |
    /// | `PORT`                     | `8080`                     |
    /// | `CORS_ORIGINS`             | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                       |
    /// | `DRAIN_TIMEOUT_SECS`       | `30`                       |
    /// | `RESTART_HISTORY_CAPACITY` | `50`                       |
    /// | `SERVICE_CONFIG_PATH`      | `config.json`              |
    /// | `ADMIN_TOKEN`              | unset (auth disabled)      |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let drain_timeout_secs: u64 = std::env::var("DRAIN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("DRAIN_TIMEOUT_SECS must be a valid u64");

        let restart_history_capacity: usize = std::env::var("RESTART_HISTORY_CAPACITY")
            .unwrap_or_else(|_| "50".into())
            .parse()
            .expect("RESTART_HISTORY_CAPACITY must be a valid usize");

        let service_config_path =
            std::env::var("SERVICE_CONFIG_PATH").unwrap_or_else(|_| "config.json".into());

        let admin_token = std::env::var("ADMIN_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            drain_timeout_secs,
            restart_history_capacity,
            service_config_path,
            admin_token,
        }
    }
}
