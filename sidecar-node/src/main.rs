//! Chain event sidecar binary.
//!
//! Receives the chain node's event feed, keeps the canonical chain in the
//! local datastore and serves the query and construction APIs.

use tracing_subscriber::EnvFilter;

use sidecar_node::cli::Cli;
use sidecar_node::config::NodeConfig;
use sidecar_node::node::Node;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Set up logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    tracing::info!("Sidecar Node v{}", env!("CARGO_PKG_VERSION"));

    // Build configuration
    let config = NodeConfig::from_cli(&cli);

    // Create and run node
    let node = Node::new(config).await?;
    node.run().await?;

    Ok(())
}
