//! Project scoping extractor.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use pagewright_core::types::ProjectId;

use crate::error::AppError;
use crate::state::AppState;

/// Header naming the project a request operates on.
pub const PROJECT_ID_HEADER: &str = "x-project-id";

/// Project used when the header is absent.
pub const DEFAULT_PROJECT_ID: &str = "default";

const MAX_PROJECT_ID_LEN: usize = 64;

/// The project a request is scoped to, taken from the `x-project-id`
/// header. Store keys and media URLs are namespaced by it.
///
/// ```ignore
/// async fn my_handler(project: ProjectScope) -> AppResult<Json<()>> {
///     tracing::info!(project_id = %project.0, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectScope(pub ProjectId);

impl ProjectScope {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromRequestParts<AppState> for ProjectScope {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(PROJECT_ID_HEADER) else {
            return Ok(ProjectScope(DEFAULT_PROJECT_ID.to_string()));
        };

        let id = value
            .to_str()
            .map_err(|_| AppError::BadRequest("x-project-id must be ASCII".into()))?;

        if !is_valid_project_id(id) {
            return Err(AppError::BadRequest(format!(
                "Invalid x-project-id '{id}'. Expected 1-{MAX_PROJECT_ID_LEN} characters of [A-Za-z0-9_-]"
            )));
        }
        Ok(ProjectScope(id.to_string()))
    }
}

fn is_valid_project_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_PROJECT_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
