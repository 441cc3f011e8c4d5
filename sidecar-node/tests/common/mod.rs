//! Shared test helpers for sidecar-node integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use sidecar_chain::{ChainConfig, ChainStore, QueryService};
use sidecar_core::{c32_address, format_hash, transaction_id, AddressVersion};
use sidecar_node::api::{api_router, event_router, AppState};
use sidecar_node::config::Network;
use sidecar_node::core_rpc::{AccountInfo, CoreRpc, RpcError};
use sidecar_storage::MemoryBackend;

/// Chain node stand-in.
pub struct FakeRpc {
    pub nonce: u64,
    pub available: bool,
    pub reject_status: Option<u16>,
    pub broadcasts: Mutex<Vec<Vec<u8>>>,
    pub accounts_queried: Mutex<Vec<String>>,
}

impl FakeRpc {
    pub fn new(nonce: u64) -> Self {
        Self {
            nonce,
            available: true,
            reject_status: None,
            broadcasts: Mutex::new(Vec::new()),
            accounts_queried: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(0)
        }
    }

    /// Answers every request with `status`.
    pub fn rejecting(status: u16) -> Self {
        Self {
            reject_status: Some(status),
            ..Self::new(0)
        }
    }
}

#[async_trait]
impl CoreRpc for FakeRpc {
    async fn get_account(&self, address: &str) -> Result<AccountInfo, RpcError> {
        if !self.available {
            return Err(RpcError::Unavailable("connection refused".to_string()));
        }
        if let Some(status) = self.reject_status {
            return Err(RpcError::Rejected {
                status,
                body: "rejected".to_string(),
            });
        }
        self.accounts_queried.lock().unwrap().push(address.to_string());
        Ok(AccountInfo {
            nonce: self.nonce,
            balance: "0x00000000000000000000000000000000".to_string(),
        })
    }

    async fn broadcast_transaction(&self, raw: Vec<u8>) -> Result<String, RpcError> {
        if !self.available {
            return Err(RpcError::Unavailable("connection refused".to_string()));
        }
        let tx_id = format_hash(&transaction_id(&raw));
        self.broadcasts.lock().unwrap().push(raw);
        Ok(tx_id)
    }
}

/// Both routers over one in-memory datastore.
pub struct TestApp {
    pub api: Router,
    pub events: Router,
    pub store: Arc<ChainStore>,
    pub rpc: Arc<FakeRpc>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(ChainConfig::default(), FakeRpc::new(7), Network::Testnet)
    }

    pub fn with(config: ChainConfig, rpc: FakeRpc, network: Network) -> Self {
        let store = Arc::new(ChainStore::open(Arc::new(MemoryBackend::new()), config).unwrap());
        let rpc = Arc::new(rpc);
        let api = api_router(AppState::new(
            QueryService::new(store.clone()),
            rpc.clone(),
            network,
        ));
        let events = event_router(store.clone());
        Self {
            api,
            events,
            store,
            rpc,
        }
    }

    pub async fn post_event(&self, path: &str, body: Value) -> (StatusCode, Value) {
        send(&self.events, json_request(path, body.to_string())).await
    }

    pub async fn post_raw_event(&self, path: &str, body: &str) -> (StatusCode, Value) {
        send(&self.events, json_request(path, body.to_string())).await
    }

    pub async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        send(&self.api, json_request(path, body.to_string())).await
    }

    pub async fn post_bytes(&self, path: &str, body: Vec<u8>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(Body::from(body))
            .unwrap();
        send(&self.api, request).await
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        send(&self.api, request).await
    }
}

fn json_request(path: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

// ============================================================================
// Event fixtures
// ============================================================================

pub fn hash_hex(tag: u8, seed: u8, height: u64) -> String {
    let mut h = [0u8; 32];
    h[0] = tag;
    h[1] = seed;
    h[2..10].copy_from_slice(&height.to_be_bytes());
    format_hash(&h)
}

pub fn sender() -> String {
    c32_address(AddressVersion::TestnetSingleSig.as_u8(), &[0x11; 20]).unwrap()
}

pub fn recipient() -> String {
    c32_address(AddressVersion::TestnetSingleSig.as_u8(), &[0x22; 20]).unwrap()
}

/// A `/new_block` body. Without a parent the block hangs off a root hash
/// nothing else uses.
pub fn block_event(
    height: u64,
    seed: u8,
    parent: Option<&Value>,
    canonical: bool,
    transactions: Vec<Value>,
) -> Value {
    let (parent_hash, parent_index_hash) = match parent {
        Some(p) => (p["block_hash"].clone(), p["index_block_hash"].clone()),
        None => (json!(hash_hex(0xff, 0, 0)), json!(hash_hex(0xfe, 0, 0))),
    };
    json!({
        "block_hash": hash_hex(1, seed, height),
        "index_block_hash": hash_hex(2, seed, height),
        "parent_block_hash": parent_hash,
        "parent_index_block_hash": parent_index_hash,
        "block_height": height,
        "burn_block_hash": hash_hex(3, seed, height),
        "burn_block_height": 800_000 + height,
        "burn_block_time": 1_700_000_000 + height * 600,
        "canonical": canonical,
        "transactions": transactions,
    })
}

pub fn tx_event(txid: &str, index: u32, tx_type: &str) -> Value {
    json!({
        "txid": txid,
        "tx_index": index,
        "tx_type": tx_type,
        "status": "success",
        "sender_address": sender(),
        "fee_rate": 180,
        "raw_tx": "0x0102",
    })
}

pub fn mempool_event(raw_tx: &[u8], receipt_time: u64) -> Value {
    json!([{
        "raw_tx": format!("0x{}", hex::encode(raw_tx)),
        "tx_type": "token_transfer",
        "sender_address": sender(),
        "fee_rate": 180,
        "receipt_time": receipt_time,
    }])
}

// ============================================================================
// Signed transaction fixtures
// ============================================================================

/// A serialized testnet token transfer with a single-sig origin.
pub fn signed_transfer(auth_type: u8, hash_mode: u8, signature: [u8; 65]) -> Vec<u8> {
    let mut raw = vec![0x80];
    raw.extend_from_slice(&0x8000_0000u32.to_be_bytes());
    raw.push(auth_type);
    raw.push(hash_mode);
    raw.extend_from_slice(&[0x11; 20]);
    raw.extend_from_slice(&3u64.to_be_bytes());
    raw.extend_from_slice(&180u64.to_be_bytes());
    raw.push(0x00);
    raw.extend_from_slice(&signature);
    raw.push(0x03);
    raw.push(0x01);
    raw.extend_from_slice(&0u32.to_be_bytes());
    raw.push(0x00);
    raw.extend_from_slice(&[0x22; 22]);
    raw
}

pub fn network_identifier(network: &str) -> Value {
    json!({ "blockchain": "stacks", "network": network })
}
