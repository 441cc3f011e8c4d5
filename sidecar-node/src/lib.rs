//! Chain event sidecar node library.
//!
//! This library provides the components of the `sidecar-node` binary: the
//! event receiver, the public query API, the Rosetta construction adapter
//! and the chain node RPC client. It is also used by the integration tests.

pub mod api;
pub mod cli;
pub mod config;
pub mod core_rpc;
pub mod node;
pub mod shutdown;
