//! Command-line argument parsing.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::config::{DbKind, Network};

/// Chain event sidecar.
#[derive(Parser, Debug, Clone)]
#[command(name = "sidecar-node")]
#[command(about = "Indexes chain-node events and serves the query and construction APIs")]
#[command(version)]
pub struct Cli {
    /// Data directory for the chain database.
    #[arg(long, env = "SIDECAR_DATA_DIR", default_value = "~/.sidecar")]
    pub data_dir: PathBuf,

    /// Storage backend.
    #[arg(long, env = "SIDECAR_DB", value_enum, default_value_t = DbKind::Rocks)]
    pub db: DbKind,

    /// Public API listen address.
    #[arg(long, env = "SIDECAR_API_LISTEN", default_value = "127.0.0.1:3999")]
    pub api_listen: SocketAddr,

    /// Event receiver listen address.
    #[arg(long, env = "SIDECAR_EVENT_LISTEN", default_value = "127.0.0.1:3700")]
    pub event_listen: SocketAddr,

    /// Base URL of the chain node's RPC interface.
    #[arg(long, env = "SIDECAR_CORE_RPC_URL", default_value = "http://127.0.0.1:20443")]
    pub core_rpc_url: String,

    /// Network served by the construction API.
    #[arg(long, env = "SIDECAR_NETWORK", value_enum, default_value_t = Network::Testnet)]
    pub network: Network,

    /// Deepest reorg accepted before ingest halts.
    #[arg(long, env = "SIDECAR_MAX_REORG_DEPTH", default_value_t = sidecar_chain::DEFAULT_MAX_REORG_DEPTH)]
    pub max_reorg_depth: u64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "SIDECAR_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Expand the data directory path (handle ~ for home).
    pub fn expanded_data_dir(&self) -> PathBuf {
        let path_str = self.data_dir.to_string_lossy();
        if let Some(stripped) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        }
        self.data_dir.clone()
    }
}
