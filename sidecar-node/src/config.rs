//! Node configuration.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::ValueEnum;

use sidecar_chain::{ChainConfig, DEFAULT_MAX_REORG_DEPTH};
use sidecar_core::AddressVersion;

use crate::cli::Cli;

/// Storage backend selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DbKind {
    /// Volatile in-process map. Everything is lost on exit.
    Memory,
    /// RocksDB under the data directory.
    Rocks,
}

/// Network the sidecar serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    /// Name used in network identifiers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }

    /// Single-sig address version for derived addresses.
    pub fn address_version(&self) -> AddressVersion {
        match self {
            Network::Mainnet => AddressVersion::MainnetSingleSig,
            Network::Testnet => AddressVersion::TestnetSingleSig,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Data directory for the chain database.
    pub data_dir: PathBuf,

    /// Storage backend.
    pub db: DbKind,

    /// Public API listen address.
    pub api_addr: SocketAddr,

    /// Event receiver listen address.
    pub event_addr: SocketAddr,

    /// Chain node RPC base URL.
    pub core_rpc_url: String,

    /// Served network.
    pub network: Network,

    /// Reorg depth bound.
    pub max_reorg_depth: u64,

    /// Log level.
    pub log_level: String,
}

impl NodeConfig {
    /// Create a node configuration from CLI arguments.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            data_dir: cli.expanded_data_dir(),
            db: cli.db,
            api_addr: cli.api_listen,
            event_addr: cli.event_listen,
            core_rpc_url: cli.core_rpc_url.trim_end_matches('/').to_string(),
            network: cli.network,
            max_reorg_depth: cli.max_reorg_depth,
            log_level: cli.log_level.clone(),
        }
    }

    /// Datastore configuration.
    pub fn chain_config(&self) -> ChainConfig {
        ChainConfig {
            max_reorg_depth: self.max_reorg_depth,
        }
    }

    /// RocksDB directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("chain.db")
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("~/.sidecar"),
            db: DbKind::Rocks,
            api_addr: SocketAddr::from(([127, 0, 0, 1], 3999)),
            event_addr: SocketAddr::from(([127, 0, 0, 1], 3700)),
            core_rpc_url: "http://127.0.0.1:20443".to_string(),
            network: Network::Testnet,
            max_reorg_depth: DEFAULT_MAX_REORG_DEPTH,
            log_level: "info".to_string(),
        }
    }
}
