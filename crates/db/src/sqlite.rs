//! SQLite-backed [`ProjectStore`].

use async_trait::async_trait;
use serde_json::Value;

use crate::repositories::DocumentRepo;
use crate::store::{DocumentKey, ProjectStore, StoreError};
use crate::DbPool;

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl ProjectStore for SqliteStore {
    async fn load(&self, project_id: &str, key: &DocumentKey) -> Result<Option<Value>, StoreError> {
        let doc_key = key.as_key();
        let Some(doc) = DocumentRepo::find(&self.pool, project_id, &doc_key).await? else {
            return Ok(None);
        };
        doc.json()
            .map(Some)
            .map_err(|source| StoreError::Malformed { key: doc_key, source })
    }

    async fn save(&self, project_id: &str, key: &DocumentKey, data: Value) -> Result<(), StoreError> {
        let doc_key = key.as_key();
        let text = data.to_string();
        DocumentRepo::upsert(&self.pool, project_id, &doc_key, &text).await?;
        tracing::debug!(project_id, doc_key = %doc_key, bytes = text.len(), "Saved document");
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        crate::health_check(&self.pool).await.is_ok()
    }
}
