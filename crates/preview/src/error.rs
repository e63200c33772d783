use std::time::Duration;

use pagewright_core::error::CoreError;
use pagewright_core::protocol::ProtocolError;

/// Failures on the client side of the preview.
///
/// Apart from `InitialLoadFailed`, these are contained to a single widget
/// or message and never take the preview down.
#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    /// The renderer has no schema for a widget or block type.
    #[error("Schema resolution failed: {0}")]
    SchemaResolution(String),

    /// Network or server failure while fetching rendered HTML.
    #[error("Render request failed: {0}")]
    TransientRender(String),

    #[error("Render of '{widget_id}' timed out after {after_ms} ms")]
    Timeout { widget_id: String, after_ms: u64 },

    /// A message belongs to a superseded preview document.
    #[error("Stale message for generation {got} (current {current})")]
    StaleGeneration { got: u64, current: u64 },

    /// A message crossing the frame boundary had the wrong shape.
    #[error(transparent)]
    ProtocolViolation(#[from] ProtocolError),

    /// The first full-document fetch failed; the user must retry.
    #[error("Preview failed to load: {0}")]
    InitialLoadFailed(String),
}

impl PreviewError {
    /// A render of `widget_id` exceeded `after`. Durations beyond `u64`
    /// milliseconds saturate.
    pub fn timeout(widget_id: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            widget_id: widget_id.into(),
            after_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl From<CoreError> for PreviewError {
    fn from(err: CoreError) -> Self {
        if err.is_schema_resolution() {
            Self::SchemaResolution(err.to_string())
        } else {
            Self::TransientRender(err.to_string())
        }
    }
}

impl From<reqwest::Error> for PreviewError {
    fn from(err: reqwest::Error) -> Self {
        Self::TransientRender(err.to_string())
    }
}
