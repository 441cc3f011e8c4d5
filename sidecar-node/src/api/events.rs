//! Chain-node event receiver.
//!
//! Each path carries one event kind. Payloads are normalized before the
//! datastore sees them: a malformed payload is answered with 400 and never
//! written. Storage failures and a halted datastore answer 500 so the node
//! redelivers.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use sidecar_chain::events::{
    apply, normalize, NormalizeError, RawBlock, RawBurnBlock, RawDroppedTransactions, RawEvent,
    RawMempoolTransaction, RawMicroblocks,
};
use sidecar_chain::{ChainError, ChainStore};

use super::{blocking, error_response, ApiError};

/// Body returned for an accepted event.
#[derive(Debug, Serialize)]
pub struct EventAck {
    pub result: &'static str,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn rejected(kind: &'static str, err: NormalizeError) -> ApiError {
    warn!(kind, error = %err, "rejected event payload");
    error_response(StatusCode::BAD_REQUEST, err.to_string())
}

fn ingest_failed(kind: &'static str, err: ChainError) -> ApiError {
    match &err {
        ChainError::IngestHalted { .. } | ChainError::ReorgInconsistency { .. } => {
            error!(kind, error = %err, "event refused, ingest is halted");
        }
        _ => warn!(kind, error = %err, "event ingest failed"),
    }
    error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

async fn ingest<T: DeserializeOwned>(
    store: Arc<ChainStore>,
    kind: &'static str,
    body: Bytes,
    wrap: fn(T) -> RawEvent,
) -> Result<Json<EventAck>, ApiError> {
    let raw: T = serde_json::from_slice(&body).map_err(|e| rejected(kind, e.into()))?;
    let op = normalize(wrap(raw), unix_now()).map_err(|e| rejected(kind, e))?;
    let applied = blocking(move || apply(&store, op).map_err(|e| ingest_failed(kind, e))).await?;
    debug!(kind, ?applied, "event applied");
    Ok(Json(EventAck { result: "ok" }))
}

pub(crate) async fn new_block(
    State(store): State<Arc<ChainStore>>,
    body: Bytes,
) -> Result<Json<EventAck>, ApiError> {
    ingest::<RawBlock>(store, "new_block", body, RawEvent::NewBlock).await
}

pub(crate) async fn new_burn_block(
    State(store): State<Arc<ChainStore>>,
    body: Bytes,
) -> Result<Json<EventAck>, ApiError> {
    ingest::<RawBurnBlock>(store, "new_burn_block", body, RawEvent::NewBurnBlock).await
}

pub(crate) async fn new_microblocks(
    State(store): State<Arc<ChainStore>>,
    body: Bytes,
) -> Result<Json<EventAck>, ApiError> {
    ingest::<RawMicroblocks>(store, "new_microblocks", body, RawEvent::NewMicroblocks).await
}

pub(crate) async fn new_mempool_tx(
    State(store): State<Arc<ChainStore>>,
    body: Bytes,
) -> Result<Json<EventAck>, ApiError> {
    ingest::<Vec<RawMempoolTransaction>>(store, "new_mempool_tx", body, RawEvent::NewMempoolTx)
        .await
}

pub(crate) async fn drop_mempool_tx(
    State(store): State<Arc<ChainStore>>,
    body: Bytes,
) -> Result<Json<EventAck>, ApiError> {
    ingest::<RawDroppedTransactions>(store, "drop_mempool_tx", body, RawEvent::DropMempoolTx)
        .await
}
