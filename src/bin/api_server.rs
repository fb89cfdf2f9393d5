// API Server Binary Entry Point
//
// Purpose: Start the Axum API server over the similarity query engine
// Usage: cargo run --features api --bin api_server [config.json]

use registry_similarity::{create_router, AppState, Config};
use std::net::SocketAddr;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (structured logging)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    // Default log level: info for our crate, warn for others
                    "registry_similarity=info,tower_http=debug,axum=debug,warn".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting API server...");

    // Optional JSON config file; environment variables override it
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(Path::new(&path))?,
        None => Config::from_env(),
    };

    tracing::info!("Configuration:");
    tracing::info!("  DATA_PATH: {:?}", config.data_path);
    tracing::info!("  PORT: {}", config.port);
    tracing::info!("  CACHE_TTL_SECS: {}", config.cache.ttl_secs);
    tracing::info!("  CACHE_MAX_ENTRIES: {:?}", config.cache.max_entries);

    let port = config.port;

    // Initialize application state (loads and validates the dataset)
    let state = AppState::new(config).await?;
    tracing::info!("Application state initialized successfully");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
