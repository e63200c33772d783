use std::path::PathBuf;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed editor origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// SQLite URL of the project store.
    pub database_url: String,
    /// Directory of additional widget schema files. Built-in widgets are
    /// always available.
    pub widget_schemas_dir: Option<PathBuf>,
    /// Prefix of project-scoped media URLs.
    pub media_endpoint: String,
    /// Script injected at the end of every full preview document.
    pub preview_runtime_url: String,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                           |
    /// |------------------------|-----------------------------------|
    /// | `HOST`                 | `0.0.0.0`                         |
    /// | `PORT`                 | `3000`                            |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`           |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                              |
    /// | `DATABASE_URL`         | `sqlite://pagewright.db?mode=rwc` |
    /// | `WIDGET_SCHEMAS_DIR`   | unset                             |
    /// | `MEDIA_ENDPOINT`       | `/api/media`                      |
    /// | `PREVIEW_RUNTIME_URL`  | `/static/preview-runtime.js`      |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
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

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://pagewright.db?mode=rwc".into());

        let widget_schemas_dir = std::env::var("WIDGET_SCHEMAS_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let media_endpoint =
            std::env::var("MEDIA_ENDPOINT").unwrap_or_else(|_| "/api/media".into());

        let preview_runtime_url = std::env::var("PREVIEW_RUNTIME_URL")
            .unwrap_or_else(|_| "/static/preview-runtime.js".into());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            database_url,
            widget_schemas_dir,
            media_endpoint,
            preview_runtime_url,
        }
    }
}
