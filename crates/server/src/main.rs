use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reelhouse_core::{
    load_config, validate_config, CatalogStore, Config, FfmpegTranscoder, SqliteCatalogStore,
    Transcoder,
};
use reelhouse_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("REELHOUSE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!(
        volumes = config.storage.volumes.len(),
        strategy = %config.storage.strategy,
        "Storage configured"
    );

    prepare_directories(&config).await;

    let store = open_store(&config);

    let transcoder = FfmpegTranscoder::new(config.transcoder.clone());
    match transcoder.validate().await {
        Ok(()) => info!("Transcoder ready: {}", transcoder.name()),
        Err(e) => warn!("Transcoder unavailable, batch and repair runs will fail: {}", e),
    }

    let state = Arc::new(AppState::new(config.clone(), Arc::new(transcoder), store));

    // Initial usage measurement feeds the least-used strategy
    match state.allocator().refresh_usage().await {
        Ok(volumes) => info!("Measured {} storage volume(s)", volumes.len()),
        Err(e) => warn!("Failed to measure storage volumes: {}", e),
    }

    // Bring the catalog in line with the disks without delaying startup
    let catalog = Arc::clone(state.catalog());
    tokio::spawn(async move {
        let entries = catalog.scan_all().await;
        info!("Startup catalog scan found {} title(s)", entries.len());
    });

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Opens the catalog store, or returns `None` for filesystem mode.
fn open_store(config: &Config) -> Option<Arc<dyn CatalogStore>> {
    if !config.database.enabled {
        info!("Catalog store disabled, using filesystem mode");
        return None;
    }

    match SqliteCatalogStore::new(&config.database.path) {
        Ok(store) => {
            info!("Catalog store opened at {:?}", config.database.path);
            Some(Arc::new(store))
        }
        Err(e) => {
            warn!(
                "Failed to open catalog store at {:?}, using filesystem mode: {}",
                config.database.path, e
            );
            None
        }
    }
}

/// Creates the library directories that are expected to exist.
async fn prepare_directories(config: &Config) {
    let dirs = [
        &config.library.raw_dir,
        &config.library.output_dir,
        &config.library.repair_output_dir,
    ];
    for dir in dirs {
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!("Failed to create directory {:?}: {}", dir, e);
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
