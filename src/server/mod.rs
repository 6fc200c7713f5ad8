//! HTTP server module
//!
//! Provides the Axum-based HTTP server for serving vSphere metrics.

pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{routing::get, Router};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::collector::CollectionOrchestrator;
use crate::config::SharedConfig;
use crate::inventory::{ClientSettings, InventoryClient, VsphereClient};
use crate::metrics::InternalMetrics;

/// Application state shared across handlers
pub struct AppState<C: InventoryClient = VsphereClient> {
    /// Live, reloadable configuration
    pub config: SharedConfig,
    /// Scrape pass runner
    pub orchestrator: Arc<CollectionOrchestrator<C>>,
    /// Exporter self-metrics
    pub metrics: InternalMetrics,
}

impl<C: InventoryClient> AppState<C> {
    pub fn new(
        config: SharedConfig,
        orchestrator: CollectionOrchestrator<C>,
        metrics: InternalMetrics,
    ) -> Self {
        Self {
            config,
            orchestrator: Arc::new(orchestrator),
            metrics,
        }
    }
}

impl<C: InventoryClient> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            orchestrator: Arc::clone(&self.orchestrator),
            metrics: self.metrics.clone(),
        }
    }
}

/// Build the router
///
/// The scrape path is read once here; changing `server.path` needs a restart.
pub fn router<C: InventoryClient>(state: AppState<C>) -> Router {
    let scrape_path = state.config.snapshot().server.path.clone();

    Router::new()
        .route("/", get(handlers::root::<C>))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::internal_metrics::<C>))
        .route(&scrape_path, get(handlers::scrape::<C>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
///
/// # Arguments
/// * `config` - Loaded configuration
/// * `port` - Server port to bind to (overrides config.server.port)
/// * `bind_address` - Bind address (overrides config.server.bind_address)
///
/// # Errors
/// Returns an error if the server fails to start
pub async fn run(config: SharedConfig, port: u16, bind_address: String) -> Result<()> {
    let snapshot = config.snapshot();
    let scrape_path = snapshot.server.path.clone();

    let client = VsphereClient::new(ClientSettings::from(&snapshot.vsphere))?;
    let orchestrator = CollectionOrchestrator::new(client)
        .with_pass_timeout(Duration::from_millis(snapshot.vsphere.timeout_ms));
    let metrics = InternalMetrics::new();

    #[cfg(unix)]
    let reload_task = spawn_reload_on_hangup(config.clone(), metrics.clone())?;

    let app = router(AppState::new(config, orchestrator, metrics));

    // Handle "localhost" specially, otherwise parse as IP address
    let bind_addr: std::net::IpAddr = if bind_address == "localhost" {
        std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST)
    } else {
        bind_address
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind_address '{}': {}. Use an IP address (e.g., '0.0.0.0', '127.0.0.1') or 'localhost'.", bind_address, e))?
    };
    let addr = SocketAddr::from((bind_addr, port));
    info!(address = %addr, scrape_path = %scrape_path, mode = ?snapshot.mode, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    #[cfg(unix)]
    reload_task.abort();

    info!("Server shutdown complete");
    Ok(())
}

/// Re-read the configuration file, keeping the previous one on failure
///
/// Returns whether the new configuration was applied.
pub fn reload_config(config: &SharedConfig, metrics: &InternalMetrics) -> bool {
    match config.reload() {
        Ok(()) => {
            metrics.record_config_reload();
            let snapshot = config.snapshot();
            info!(
                path = %config.path().display(),
                mode = ?snapshot.mode,
                clusters = snapshot.clusters.len(),
                "Configuration reloaded"
            );
            true
        }
        Err(e) => {
            metrics.record_config_reload_failure();
            error!(
                path = %config.path().display(),
                error = %e,
                "Configuration reload failed, keeping previous configuration"
            );
            false
        }
    }
}

/// Reload the configuration on every SIGHUP
#[cfg(unix)]
fn spawn_reload_on_hangup(
    config: SharedConfig,
    metrics: InternalMetrics,
) -> Result<tokio::task::JoinHandle<()>> {
    let mut hangup = signal::unix::signal(signal::unix::SignalKind::hangup())?;

    Ok(tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            info!("Received SIGHUP, reloading configuration");
            reload_config(&config, &metrics);
        }
    }))
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install terminate signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
