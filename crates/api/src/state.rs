use std::sync::Arc;

use pagewright_db::ProjectStore;
use pagewright_render::PageRenderer;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Project documents (global widgets, theme, pages).
    pub store: Arc<dyn ProjectStore>,
    /// Widget and page renderer over the loaded schema registry.
    pub renderer: Arc<PageRenderer>,
    pub config: Arc<ServerConfig>,
}
