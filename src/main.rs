//! Peercache node - serves one cache group to its peers
//!
//! Backed by a small in-memory demo database with a simulated slow lookup.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use peercache::api::{create_api_router, create_peer_router, AppState};
use peercache::peers::{DEFAULT_BASE_PATH, DEFAULT_PEER_TIMEOUT};
use peercache::{CacheError, Config, Getter, GroupRegistry, HttpPool};

// == Demo Database ==
/// Authoritative source the node loads misses from.
struct SlowDb {
    rows: HashMap<&'static str, &'static str>,
    delay: Duration,
}

impl SlowDb {
    fn new() -> Self {
        Self {
            rows: HashMap::from([("Cheng", "666"), ("Zhang", "777"), ("Namei", "500")]),
            delay: Duration::from_millis(100),
        }
    }
}

#[async_trait::async_trait]
impl Getter for SlowDb {
    async fn get(&self, key: &str) -> peercache::Result<Vec<u8>> {
        info!("[SlowDB] search key {}", key);
        tokio::time::sleep(self.delay).await;
        self.rows
            .get(key)
            .map(|v| v.as_bytes().to_vec())
            .ok_or_else(|| CacheError::LoadFailed(format!("{} not exist", key)))
    }
}

/// Main entry point for a cache node.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the group and wire it to the peer pool
/// 4. Start the peer server, and the API server when configured
/// 5. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "peercache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting peercache node");

    let config = Config::from_env();
    info!(
        "Configuration loaded: group={}, cache_bytes={}, policy={}, replicas={}, port={}, self={}, peers={:?}",
        config.group_name,
        config.cache_bytes,
        config.eviction_policy,
        config.replicas,
        config.server_port,
        config.self_addr,
        config.peers
    );

    let registry = Arc::new(GroupRegistry::new());
    let group = registry.new_group(
        config.group_name.clone(),
        config.cache_bytes,
        config.eviction_policy,
        SlowDb::new(),
    );

    let pool = Arc::new(HttpPool::with_options(
        config.self_addr.clone(),
        DEFAULT_BASE_PATH,
        config.replicas,
        DEFAULT_PEER_TIMEOUT,
    )?);
    pool.set(&config.peers);
    group.register_peers(pool.clone())?;
    info!(
        "Peer pool ready for {}: {:?}",
        pool.self_addr(),
        pool.peers()
    );

    if let Some(api_port) = config.api_port {
        let app = create_api_router(group.clone());
        let addr = SocketAddr::from(([0, 0, 0, 0], api_port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding API server to {}", addr))?;
        info!("API server listening on http://{}", addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
            {
                tracing::error!("API server error: {}", e);
            }
        });
    }

    let app = create_peer_router(AppState::new(registry), pool.base_path());
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding peer server to {}", addr))?;
    info!("Peer server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("peer server")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
}
