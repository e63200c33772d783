#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use pagewright_api::config::ServerConfig;
use pagewright_api::router::build_app_router;
use pagewright_api::state::AppState;
use pagewright_core::schema::SchemaRegistry;
use pagewright_db::{DocumentKey, MemoryStore, ProjectStore, StoreError};
use pagewright_render::{PageOptions, PageRenderer, WidgetRenderer};

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        database_url: "sqlite::memory:".to_string(),
        widget_schemas_dir: None,
        media_endpoint: "/api/media".to_string(),
        preview_runtime_url: "/static/preview-runtime.js".to_string(),
    }
}

/// Build the full application router over `store`, with the same
/// middleware stack as the binary.
pub fn build_test_app(store: Arc<dyn ProjectStore>) -> Router {
    let config = test_config();
    let registry = SchemaRegistry::builtin().unwrap();
    let renderer = PageRenderer::new(
        WidgetRenderer::new(Arc::new(registry)),
        PageOptions {
            runtime_script: Some(config.preview_runtime_url.clone()),
            ..PageOptions::default()
        },
    );
    let state = AppState {
        store,
        renderer: Arc::new(renderer),
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

/// Router over a fresh in-memory store.
pub fn memory_app() -> Router {
    build_test_app(Arc::new(MemoryStore::new()))
}

/// Serve `app` on an ephemeral local port. Returns the base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Base URL of a local port with nothing listening on it.
pub async fn closed_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Store whose backend is unreachable.
pub struct DownStore;

#[async_trait]
impl ProjectStore for DownStore {
    async fn load(&self, _: &str, _: &DocumentKey) -> Result<Option<Value>, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn save(&self, _: &str, _: &DocumentKey, _: Value) -> Result<(), StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn is_healthy(&self) -> bool {
        false
    }
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, &[]).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body.to_string()), &[]).await
}

/// Issue a request with extra headers and an optional JSON body.
pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    body: Option<String>,
    headers: &[(&str, &str)],
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}
