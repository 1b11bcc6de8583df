//! redsnano - A read-through, self-validating key/value cache server
//!
//! Exposes the cache over HTTP together with a user registration service.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use redsnano::api::create_app;
use redsnano::{spawn_cleanup_task, AppState, Config, UsersState};

/// Main entry point for the redsnano cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the cache engines (origin file + snapshot) for `/cache` and `/users`
/// 4. Start background TTL cleanup tasks if enabled
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured address
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "redsnano=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting redsnano cache server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: default_ttl={}s, port={}, cleanup_interval={}s, inline_revalidation={}",
        config.default_ttl, config.server_port, config.cleanup_interval, config.revalidate_inline
    );

    let state = AppState::from_config(&config)
        .await
        .with_context(|| format!("opening origin {}", config.origin_path.display()))?;
    let users = UsersState::from_config(&config)
        .await
        .with_context(|| format!("opening user directory {}", config.users_db_path.display()))?;
    info!("Cache engines initialized");

    let mut cleanup_handles = Vec::new();
    if config.cleanup_interval > 0 {
        cleanup_handles.push(spawn_cleanup_task(
            state.cache.clone(),
            config.cleanup_interval,
        ));
        cleanup_handles.push(spawn_cleanup_task(
            users.cache.clone(),
            config.cleanup_interval,
        ));
        info!("Background cleanup tasks started");
    }

    let app = create_app(state, users);

    let listener =
        tokio::net::TcpListener::bind((config.server_host.as_str(), config.server_port))
            .await
            .with_context(|| {
                format!("binding {}:{}", config.server_host, config.server_port)
            })?;
    let addr: SocketAddr = listener.local_addr().context("reading bound address")?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handles))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the cleanup tasks and allows graceful shutdown.
/// In-flight revalidations are not awaited.
async fn shutdown_signal(cleanup_handles: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
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

    for handle in cleanup_handles {
        handle.abort();
    }
    warn!("Cleanup tasks aborted");
}
