//! SQLite document store against an in-memory database.

use assert_matches::assert_matches;
use pagewright_core::page::GlobalWidgetKind;
use pagewright_core::widget::Widget;
use pagewright_db::repositories::DocumentRepo;
use pagewright_db::{DocumentKey, ProjectStore, SqliteStore, StoreError};
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;

/// Each connection to `sqlite::memory:` is its own database, so the pool
/// is pinned to a single connection.
async fn store() -> SqliteStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    pagewright_db::run_migrations(&pool).await.unwrap();
    SqliteStore::new(pool)
}

// ---------------------------------------------------------------------------
// Test: load of a never-saved key returns None
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_document_loads_as_none() {
    let store = store().await;
    let loaded = store
        .load("default", &DocumentKey::GlobalWidget(GlobalWidgetKind::Header))
        .await
        .unwrap();
    assert!(loaded.is_none());
    assert!(store.is_healthy().await);
}

// ---------------------------------------------------------------------------
// Test: save then load returns the same JSON and upserts in place
// ---------------------------------------------------------------------------

#[tokio::test]
async fn save_overwrites_existing_document() {
    let store = store().await;
    let key = DocumentKey::GlobalWidget(GlobalWidgetKind::Footer);
    store.save("default", &key, json!({ "type": "footer" })).await.unwrap();
    store.save("default", &key, json!(null)).await.unwrap();

    let loaded = store.load("default", &key).await.unwrap().unwrap();
    assert_eq!(loaded, json!(null));
    let row = DocumentRepo::find(store.pool(), "default", "global:footer")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.data, "null");
}

// ---------------------------------------------------------------------------
// Test: global widgets round through the store, scoped per project
// ---------------------------------------------------------------------------

#[tokio::test]
async fn global_widgets_are_stored_per_project() {
    let store = store().await;
    store
        .save_global_widget("acme", GlobalWidgetKind::Footer, &Widget::new("footer"))
        .await
        .unwrap();

    let globals = store.load_global_widgets("acme").await.unwrap();
    assert!(globals.header.is_none());
    assert_eq!(globals.footer.unwrap().widget_type, "footer");
    assert!(store.load_global_widgets("other").await.unwrap().footer.is_none());
}

// ---------------------------------------------------------------------------
// Test: a stored document of the wrong shape surfaces as Malformed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_document_is_reported() {
    let store = store().await;
    store
        .save("default", &DocumentKey::GlobalWidget(GlobalWidgetKind::Header), json!(42))
        .await
        .unwrap();
    assert_matches!(
        store.load_global_widgets("default").await,
        Err(StoreError::Malformed { ref key, .. }) if key == "global:header"
    );
}
