#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Unknown widget type: {0}")]
    UnknownWidgetType(String),

    #[error("Unknown block type '{block_type}' for widget type '{widget_type}'")]
    UnknownBlockType {
        widget_type: String,
        block_type: String,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` for errors caused by a widget or block type missing
    /// from the schema registry.
    pub fn is_schema_resolution(&self) -> bool {
        matches!(
            self,
            Self::UnknownWidgetType(_) | Self::UnknownBlockType { .. }
        )
    }
}
