//! Stored project documents.

use serde::Serialize;
use sqlx::FromRow;
use pagewright_core::types::Timestamp;

/// A row from the `documents` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Document {
    pub project_id: String,
    pub doc_key: String,
    /// JSON text of the stored value.
    pub data: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Document {
    /// Parse the stored JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.data)
    }
}
