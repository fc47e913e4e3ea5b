use anyhow::Context;
use std::env;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bookshelf::{
    create_router,
    handlers::STARTED_AT,
    services::DiskStore,
    AppState, Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    once_cell::sync::Lazy::force(&STARTED_AT);

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bookshelf=debug,tower_http=debug,axum::rejection=trace".into());
    let json_logs = env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().with_target(false)).init();
    }

    // Load configuration
    let config = Config::from_env()?;

    tracing::info!("Starting Bookshelf EPUB Service");
    tracing::info!("Upload directory: {}", config.upload_dir.display());
    tracing::info!("Max upload size: {}MB", config.max_upload_size_mb);
    tracing::info!("Allowed origins: {:?}", config.allowed_origins);

    // The storage root must exist before any request is served.
    let store = DiskStore::open(&config.upload_dir)
        .with_context(|| format!("Failed to prepare upload directory {}", config.upload_dir.display()))?;

    let state = AppState::new(Arc::new(store), config.recursive_listing);
    let app = create_router(state, &config);

    let addr = format!("{}:{}", config.server_host, config.server_port);

    tracing::info!("Server listening on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("HTTP server error")?;

    Ok(())
}
