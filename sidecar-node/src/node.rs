//! Node orchestrator.
//!
//! Opens the datastore and serves the event receiver and the public API
//! until a shutdown signal arrives.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use sidecar_chain::{ChainStore, QueryService};
use sidecar_core::format_hash;
use sidecar_storage::{KvBackend, MemoryBackend, RocksBackend};

use crate::api::{api_router, event_router, AppState};
use crate::config::{DbKind, NodeConfig};
use crate::core_rpc::{CoreRpc, HttpCoreRpc};
use crate::shutdown::{shutdown_channel, wait_for_shutdown_signal, ShutdownGuard, ShutdownTx};

/// The main node structure.
pub struct Node {
    /// Node configuration.
    config: NodeConfig,

    /// Canonical chain datastore.
    store: Arc<ChainStore>,

    /// Chain node RPC client.
    rpc: Arc<dyn CoreRpc>,

    /// Shutdown signal sender.
    shutdown_tx: ShutdownTx,
}

impl Node {
    /// Create a new node with the given configuration.
    pub async fn new(config: NodeConfig) -> anyhow::Result<Self> {
        let rpc = Arc::new(HttpCoreRpc::new(&config.core_rpc_url)?);
        Self::with_rpc(config, rpc)
    }

    /// Create a node that talks to the chain node through `rpc`.
    pub fn with_rpc(config: NodeConfig, rpc: Arc<dyn CoreRpc>) -> anyhow::Result<Self> {
        let backend: Arc<dyn KvBackend> = match config.db {
            DbKind::Memory => {
                tracing::info!("Running without persistence (memory backend)");
                Arc::new(MemoryBackend::new())
            }
            DbKind::Rocks => {
                std::fs::create_dir_all(&config.data_dir).with_context(|| {
                    format!("failed to create data directory {:?}", config.data_dir)
                })?;
                tracing::info!("Data directory: {:?}", config.data_dir);
                Arc::new(RocksBackend::open(config.db_path())?)
            }
        };

        let store = Arc::new(ChainStore::open(backend, config.chain_config())?);
        match store.chain_tip()? {
            Some(tip) => tracing::info!(
                "Chain tip at height {} ({})",
                tip.block_height,
                format_hash(&tip.block_hash)
            ),
            None => tracing::info!("Datastore is empty, waiting for the first block"),
        }

        let (shutdown_tx, _) = shutdown_channel();

        Ok(Self {
            config,
            store,
            rpc,
            shutdown_tx,
        })
    }

    /// Router for the public API.
    pub fn api_router(&self) -> Router {
        let query = QueryService::new(self.store.clone());
        api_router(AppState::new(query, self.rpc.clone(), self.config.network))
    }

    /// Router for the chain-node event receiver.
    pub fn event_router(&self) -> Router {
        event_router(self.store.clone())
    }

    /// Run the node.
    pub async fn run(&self) -> anyhow::Result<()> {
        tracing::info!("Starting sidecar...");
        tracing::info!("  Network: {}", self.config.network);
        tracing::info!("  Storage: {:?}", self.config.db);
        tracing::info!("  Chain node RPC: {}", self.config.core_rpc_url);
        tracing::info!("  Max reorg depth: {}", self.config.max_reorg_depth);

        let (_, event_handle) = serve(
            "event receiver",
            self.config.event_addr,
            self.event_router(),
            &self.shutdown_tx,
        )
        .await?;
        let (_, api_handle) = serve(
            "API server",
            self.config.api_addr,
            self.api_router(),
            &self.shutdown_tx,
        )
        .await?;

        wait_for_shutdown_signal().await;

        tracing::info!("Shutting down sidecar...");
        let _ = self.shutdown_tx.send(());

        let _ = event_handle.await;
        tracing::info!("Event receiver stopped");
        let _ = api_handle.await;
        tracing::info!("API server stopped");

        if let Err(e) = self.store.backend().flush() {
            tracing::warn!(error = %e, "failed to flush datastore");
        }

        tracing::info!("Sidecar shutdown complete");
        Ok(())
    }

    /// Get the datastore (for testing).
    pub fn store(&self) -> &Arc<ChainStore> {
        &self.store
    }

    /// Get the node configuration.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Get the shutdown sender.
    pub fn shutdown_tx(&self) -> &ShutdownTx {
        &self.shutdown_tx
    }
}

/// Bind `addr` and serve `router` until the shutdown signal.
///
/// Returns the bound address, which differs from `addr` when port 0 was
/// requested.
pub async fn serve(
    name: &'static str,
    addr: SocketAddr,
    router: Router,
    shutdown_tx: &ShutdownTx,
) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {name} on {addr}"))?;
    let local_addr = listener.local_addr()?;
    let mut guard = ShutdownGuard::new(shutdown_tx);

    let handle = tokio::spawn(async move {
        let server = axum::serve(listener, router)
            .with_graceful_shutdown(async move { guard.wait().await });
        if let Err(err) = server.await {
            tracing::warn!(?err, "{name} terminated with error");
        }
    });

    tracing::info!(listen = %local_addr, "{name} listening");
    Ok((local_addr, handle))
}
