//! Node orchestration tests: datastore selection and listener lifecycle.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use sidecar_node::config::{DbKind, NodeConfig};
use sidecar_node::node::{serve, Node};

use common::{block_event, FakeRpc};

fn rocks_config(dir: &TempDir) -> NodeConfig {
    NodeConfig {
        data_dir: dir.path().join("sidecar"),
        db: DbKind::Rocks,
        ..NodeConfig::default()
    }
}

async fn post_block(router: Router, body: Value) -> StatusCode {
    let request = Request::builder()
        .method("POST")
        .uri("/new_block")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    router.oneshot(request).await.unwrap().status()
}

#[tokio::test]
async fn test_rocks_datastore_survives_restart() {
    let dir = TempDir::new().unwrap();
    let a1 = block_event(1, 1, None, true, vec![]);
    let a2 = block_event(2, 1, Some(&a1), true, vec![]);

    {
        let node = Node::with_rpc(rocks_config(&dir), Arc::new(FakeRpc::new(0))).unwrap();
        assert!(node.store().chain_tip().unwrap().is_none());
        assert_eq!(post_block(node.event_router(), a1).await, StatusCode::OK);
        assert_eq!(post_block(node.event_router(), a2.clone()).await, StatusCode::OK);
        node.store().backend().flush().unwrap();
    }

    assert!(dir.path().join("sidecar").join("chain.db").exists());

    let node = Node::with_rpc(rocks_config(&dir), Arc::new(FakeRpc::new(0))).unwrap();
    let tip = node.store().chain_tip().unwrap().unwrap();
    assert_eq!(tip.block_height, 2);
    assert_eq!(
        sidecar_core::format_hash(&tip.block_hash),
        a2["block_hash"].as_str().unwrap()
    );
}

#[tokio::test]
async fn test_memory_datastore_starts_empty() {
    let config = NodeConfig {
        db: DbKind::Memory,
        ..NodeConfig::default()
    };
    let node = Node::with_rpc(config, Arc::new(FakeRpc::new(0))).unwrap();
    assert!(node.store().chain_tip().unwrap().is_none());
    assert_eq!(node.config().db, DbKind::Memory);
}

#[tokio::test]
async fn test_serve_until_shutdown() {
    let config = NodeConfig {
        db: DbKind::Memory,
        ..NodeConfig::default()
    };
    let node = Node::with_rpc(config, Arc::new(FakeRpc::new(0))).unwrap();
    let any_port: SocketAddr = "127.0.0.1:0".parse().unwrap();

    let (addr, handle) = serve("API server", any_port, node.api_router(), node.shutdown_tx())
        .await
        .unwrap();
    assert_ne!(addr.port(), 0);

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap();
    let response = client
        .get(format!("http://{addr}/extended/v1/status"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let bytes = response.bytes().await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ready");
    assert!(body["chain_tip"].is_null());

    node.shutdown_tx().send(()).unwrap();
    tokio::time::timeout(std::time::Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_serve_reports_bind_failure() {
    let config = NodeConfig {
        db: DbKind::Memory,
        ..NodeConfig::default()
    };
    let node = Node::with_rpc(config, Arc::new(FakeRpc::new(0))).unwrap();
    let any_port: SocketAddr = "127.0.0.1:0".parse().unwrap();

    let (addr, _handle) = serve("first", any_port, node.api_router(), node.shutdown_tx())
        .await
        .unwrap();
    let err = serve("second", addr, node.api_router(), node.shutdown_tx())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("failed to bind second"));

    let _ = node.shutdown_tx().send(());
}
