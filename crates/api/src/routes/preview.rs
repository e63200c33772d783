//! Route definitions for the preview renderer.
//!
//! ```text
//! POST   /                        render_page
//! POST   /widget                  render_widget
//! GET    /global-widgets          get_global_widgets
//! POST   /global-widgets/{type}   save_global_widget
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::preview;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(preview::render_page))
        .route("/widget", post(preview::render_widget))
        .route("/global-widgets", get(preview::get_global_widgets))
        .route(
            "/global-widgets/{widget_type}",
            post(preview::save_global_widget),
        )
}
