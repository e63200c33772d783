pub mod health;
pub mod preview;

use axum::Router;

use crate::state::AppState;

/// All preview routes, mounted at the root.
///
/// ```text
/// /preview                        full document
/// /preview/widget                 single widget fragment
/// /preview/global-widgets         header/footer store
/// ```
pub fn app_routes() -> Router<AppState> {
    Router::new().nest("/preview", preview::router())
}
