use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pagewright_api::config::ServerConfig;
use pagewright_api::router::build_app_router;
use pagewright_api::state::AppState;
use pagewright_core::schema::SchemaRegistry;
use pagewright_db::SqliteStore;
use pagewright_render::{PageOptions, PageRenderer, WidgetRenderer};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pagewright_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let pool = pagewright_db::create_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    pagewright_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    pagewright_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Widget schemas ---
    let mut registry = SchemaRegistry::builtin().expect("Built-in widget schemas must parse");
    if let Some(dir) = &config.widget_schemas_dir {
        let loaded = registry
            .load_dir(dir)
            .expect("Failed to load widget schemas");
        tracing::info!(dir = %dir.display(), loaded, "Theme widget schemas loaded");
    }
    tracing::info!(widget_types = registry.len(), "Schema registry ready");

    // --- Renderer ---
    let renderer = PageRenderer::new(
        WidgetRenderer::new(Arc::new(registry)),
        PageOptions {
            runtime_script: Some(config.preview_runtime_url.clone()),
            ..PageOptions::default()
        },
    );

    // --- App state ---
    let state = AppState {
        store: Arc::new(SqliteStore::new(pool)),
        renderer: Arc::new(renderer),
        config: Arc::new(config.clone()),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid HOST:PORT combination");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");

    tracing::info!(%addr, "Preview server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Server shut down");
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, starting graceful shutdown"),
        () = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
