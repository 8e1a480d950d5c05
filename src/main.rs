//! dist_cache server
//!
//! Runs either the coordinator façade or a single storage node, depending
//! on `CACHE_ROLE`.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dist_cache::api::{create_node_router, create_router};
use dist_cache::cache::SleepBackoff;
use dist_cache::config::Role;
use dist_cache::{spawn_cleanup_task, AppState, Config, MemoryBackend, NodeState};

/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the role's state and start the cleanup task
/// 4. Serve HTTP until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dist_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    info!(
        "Configuration loaded: role={:?}, port={}, nodes={}, virtual_nodes={}, default_ttl={}s",
        config.role,
        config.server_port,
        config.nodes.len(),
        config.virtual_nodes,
        config.default_ttl
    );

    // Flipped on shutdown so lease backoffs stop waiting
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (app, cleanup_handle) = match config.role {
        Role::Coordinator => {
            let backoff = Arc::new(SleepBackoff::new(shutdown_rx));
            let (state, memory_nodes) = AppState::from_config(&config, backoff)
                .context("failed to build coordinator")?;
            info!(
                "Coordinator ready over {:?}",
                state.cache.ring().all_nodes()
            );
            let cleanup = spawn_cleanup_task(memory_nodes, config.cleanup_interval);
            (create_router(state), cleanup)
        }
        Role::Storage => {
            let store = MemoryBackend::new(format!("storage:{}", config.server_port));
            let cleanup = spawn_cleanup_task(vec![store.clone()], config.cleanup_interval);
            info!("Storage node ready");
            (create_node_router(NodeState::new(store)), cleanup)
        }
    };

    serve(app, config.server_port, shutdown_tx, cleanup_handle).await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn serve(
    app: Router,
    port: u16,
    shutdown_tx: watch::Sender<bool>,
    cleanup_handle: JoinHandle<()>,
) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx, cleanup_handle))
        .await
        .context("server error")
}

/// Waits for Ctrl+C or SIGTERM, then cancels pending lease waits and the
/// cleanup task.
async fn shutdown_signal(shutdown_tx: watch::Sender<bool>, cleanup_handle: JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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

    // Receivers may already be gone in the storage role
    let _ = shutdown_tx.send(true);
    cleanup_handle.abort();
    warn!("Cleanup task aborted");
}
