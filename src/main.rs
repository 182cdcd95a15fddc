//! Whirlbird Server - score, leaderboard and publishing API
//!
//! This is the main entry point for the server. It handles:
//! - Score submission with per-user rate windows
//! - The top-3 leaderboard
//! - Publishing scores as posts and comments

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use whirlbird_server::app::AppState;
use whirlbird_server::config::Config;
use whirlbird_server::http::build_router;
use whirlbird_server::util::time::init_server_time;

const THROTTLE_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    // Initialize server time tracking
    init_server_time();

    info!("Starting Whirlbird Server");
    info!("Server address: {}", config.server_addr);

    // Create application state
    let state = AppState::new(config.clone());

    // Forget idle throttle keys
    let throttle = state.throttle.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(THROTTLE_PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            throttle.prune();
        }
    });

    // Build router
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
