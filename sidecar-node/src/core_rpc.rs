//! Client for the chain node's RPC interface.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the chain node RPC.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The node could not be reached or did not answer in time.
    #[error("chain node unavailable: {0}")]
    Unavailable(String),

    /// The node answered with a non-success status.
    #[error("chain node rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The node answered with a body we could not read.
    #[error("unexpected chain node response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        RpcError::Unavailable(e.to_string())
    }
}

/// Account state as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub nonce: u64,
    /// Hex-encoded balance, as the node renders it.
    pub balance: String,
}

/// Operations the sidecar needs from the chain node.
#[async_trait]
pub trait CoreRpc: Send + Sync {
    /// Current nonce and balance of `address`.
    async fn get_account(&self, address: &str) -> Result<AccountInfo, RpcError>;

    /// Submit a serialized signed transaction and return its id.
    async fn broadcast_transaction(&self, raw: Vec<u8>) -> Result<String, RpcError>;
}

/// [`CoreRpc`] over HTTP.
pub struct HttpCoreRpc {
    client: Client,
    base_url: String,
}

impl HttpCoreRpc {
    /// Create a client for the node at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RpcError::Unavailable(format!("failed to build RPC client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

async fn rejected(response: reqwest::Response) -> RpcError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    RpcError::Rejected { status, body }
}

#[async_trait]
impl CoreRpc for HttpCoreRpc {
    async fn get_account(&self, address: &str) -> Result<AccountInfo, RpcError> {
        let url = self.endpoint(&format!("v2/accounts/{address}?proof=0"));
        let response = self.client.get(url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(rejected(response).await);
        }
        response
            .json::<AccountInfo>()
            .await
            .map_err(|e| RpcError::InvalidResponse(e.to_string()))
    }

    async fn broadcast_transaction(&self, raw: Vec<u8>) -> Result<String, RpcError> {
        let response = self
            .client
            .post(self.endpoint("v2/transactions"))
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(raw)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        let body = response
            .text()
            .await
            .map_err(|e| RpcError::InvalidResponse(e.to_string()))?;
        Ok(parse_txid(&body))
    }
}

/// The node answers a broadcast with the txid as a JSON string.
fn parse_txid(body: &str) -> String {
    serde_json::from_str::<String>(body).unwrap_or_else(|_| body.trim().to_string())
}
