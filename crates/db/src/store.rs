//! Async key-value store over project documents.

use async_trait::async_trait;
use serde_json::Value;

use pagewright_core::page::{GlobalWidgetKind, GlobalWidgets};
use pagewright_core::widget::Widget;

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Stored document '{key}' is malformed: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Which document of a project. Pages and theme settings are owned by
/// the editor's own persistence; the preview service stores only the
/// shared header and footer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentKey {
    GlobalWidget(GlobalWidgetKind),
}

impl DocumentKey {
    /// Storage key, e.g. `global:header`.
    pub fn as_key(&self) -> String {
        match self {
            Self::GlobalWidget(kind) => format!("global:{kind}"),
        }
    }
}

impl std::fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_key())
    }
}

/// Project-scoped document storage.
///
/// `load` returns `None` for documents that were never saved. A `null`
/// value is a valid document (a cleared global widget).
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn load(&self, project_id: &str, key: &DocumentKey) -> Result<Option<Value>, StoreError>;

    async fn save(&self, project_id: &str, key: &DocumentKey, data: Value) -> Result<(), StoreError>;

    /// Whether the backing storage is reachable.
    async fn is_healthy(&self) -> bool;

    /// Header and footer of a project; missing slots are `None`.
    async fn load_global_widgets(&self, project_id: &str) -> Result<GlobalWidgets, StoreError> {
        let mut globals = GlobalWidgets::default();
        for kind in [GlobalWidgetKind::Header, GlobalWidgetKind::Footer] {
            let key = DocumentKey::GlobalWidget(kind);
            let widget = match self.load(project_id, &key).await? {
                Some(value) => decode::<Option<Widget>>(&key, value)?,
                None => None,
            };
            globals.set(kind, widget);
        }
        Ok(globals)
    }

    async fn save_global_widget(
        &self,
        project_id: &str,
        kind: GlobalWidgetKind,
        widget: &Widget,
    ) -> Result<(), StoreError> {
        let key = DocumentKey::GlobalWidget(kind);
        let value = encode(&key, widget)?;
        self.save(project_id, &key, value).await
    }
}

fn decode<T: serde::de::DeserializeOwned>(key: &DocumentKey, value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|source| StoreError::Malformed {
        key: key.as_key(),
        source,
    })
}

fn encode<T: serde::Serialize>(key: &DocumentKey, value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|source| StoreError::Malformed {
        key: key.as_key(),
        source,
    })
}
