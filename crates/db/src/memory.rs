//! In-memory [`ProjectStore`].

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::store::{DocumentKey, ProjectStore, StoreError};

/// Documents keyed by `(project_id, doc_key)`. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<(String, String), Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents across all projects.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn load(&self, project_id: &str, key: &DocumentKey) -> Result<Option<Value>, StoreError> {
        let documents = self.documents.read().await;
        Ok(documents
            .get(&(project_id.to_string(), key.as_key()))
            .cloned())
    }

    async fn save(&self, project_id: &str, key: &DocumentKey, data: Value) -> Result<(), StoreError> {
        self.documents
            .write()
            .await
            .insert((project_id.to_string(), key.as_key()), data);
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}
