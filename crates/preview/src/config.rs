use std::time::Duration;

const DEFAULT_RENDER_TIMEOUT_MS: u64 = 5000;

/// Client-side preview configuration.
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Base URL of the preview API (default: `http://localhost:3000`).
    pub api_url: String,
    /// Per-request render timeout (default: 5000 ms). Renders that take
    /// longer are logged and dropped.
    pub render_timeout: Duration,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000".to_string(),
            render_timeout: Duration::from_millis(DEFAULT_RENDER_TIMEOUT_MS),
        }
    }
}

impl PreviewConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                 |
    /// |-----------------------------|-------------------------|
    /// | `PREVIEW_API_URL`           | `http://localhost:3000` |
    /// | `PREVIEW_RENDER_TIMEOUT_MS` | `5000`                  |
    pub fn from_env() -> Self {
        let api_url = std::env::var("PREVIEW_API_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .trim_end_matches('/')
            .to_string();

        let timeout_ms = parse_timeout_ms(std::env::var("PREVIEW_RENDER_TIMEOUT_MS").ok());

        Self {
            api_url,
            render_timeout: Duration::from_millis(timeout_ms),
        }
    }
}

/// An unparseable value falls back to the default with a warning.
fn parse_timeout_ms(raw: Option<String>) -> u64 {
    let Some(raw) = raw else {
        return DEFAULT_RENDER_TIMEOUT_MS;
    };
    match raw.trim().parse() {
        Ok(ms) => ms,
        Err(e) => {
            tracing::warn!(
                value = %raw,
                error = %e,
                default_ms = DEFAULT_RENDER_TIMEOUT_MS,
                "Invalid PREVIEW_RENDER_TIMEOUT_MS; using default"
            );
            DEFAULT_RENDER_TIMEOUT_MS
        }
    }
}
