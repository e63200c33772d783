//! Repository for the `documents` table.

use sqlx::SqlitePool;

use crate::models::document::Document;

/// Column list for `documents` queries.
const COLUMNS: &str = "project_id, doc_key, data, created_at, updated_at";

/// Provides data access for project documents.
pub struct DocumentRepo;

impl DocumentRepo {
    /// Find a document by project and key.
    pub async fn find(
        pool: &SqlitePool,
        project_id: &str,
        doc_key: &str,
    ) -> Result<Option<Document>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM documents WHERE project_id = ? AND doc_key = ?");
        sqlx::query_as::<_, Document>(&query)
            .bind(project_id)
            .bind(doc_key)
            .fetch_optional(pool)
            .await
    }

    /// Insert or replace a document's data.
    pub async fn upsert(
        pool: &SqlitePool,
        project_id: &str,
        doc_key: &str,
        data: &str,
    ) -> Result<Document, sqlx::Error> {
        let query = format!(
            "INSERT INTO documents (project_id, doc_key, data, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT (project_id, doc_key) DO UPDATE SET \
                 data = excluded.data, \
                 updated_at = excluded.updated_at \
             RETURNING {COLUMNS}"
        );
        let now = chrono::Utc::now();
        sqlx::query_as::<_, Document>(&query)
            .bind(project_id)
            .bind(doc_key)
            .bind(data)
            .bind(now)
            .bind(now)
            .fetch_one(pool)
            .await
    }
}
