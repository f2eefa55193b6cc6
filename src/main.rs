//! Pharma Admin - gateway for pharmacy and pharmaceutical-company admin tools
//!
//! Binary entry point: loads configuration, starts the maintenance task and
//! serves the gateway API.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pharma_admin::{create_router, spawn_maintenance_task, AppState, Config};

/// Main entry point for the admin gateway.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the backend client, query cache and session store
/// 4. Start background maintenance task
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pharma_admin=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Pharma Admin Gateway");

    let config = Config::from_env();
    info!(
        "Configuration loaded: api={}, stale_time={}s, gc_time={}s, retries={}, port={}",
        config.api_base_url,
        config.stale_time,
        config.gc_time,
        config.retry_count,
        config.server_port
    );

    let state = AppState::from_config(&config).context("failed to build backend client")?;
    info!("Query cache initialized");

    let maintenance_handle = spawn_maintenance_task(
        state.queries().clone(),
        state.sessions.clone(),
        config.cleanup_interval,
    );
    info!("Background maintenance task started");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(maintenance_handle))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the maintenance task and allows graceful shutdown.
async fn shutdown_signal(maintenance_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    maintenance_handle.abort();
    warn!("Maintenance task aborted");
}
