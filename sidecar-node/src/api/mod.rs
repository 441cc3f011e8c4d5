//! HTTP surfaces: the public query API and the chain-node event receiver.

pub mod events;
pub mod rosetta;
mod tx;
pub mod views;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use sidecar_chain::{ChainStore, QueryError, QueryService};

use crate::config::Network;
use crate::core_rpc::CoreRpc;

/// Shared state for the public API.
#[derive(Clone)]
pub struct AppState {
    pub query: QueryService,
    pub rpc: Arc<dyn CoreRpc>,
    pub network: Network,
}

impl AppState {
    pub fn new(query: QueryService, rpc: Arc<dyn CoreRpc>, network: Network) -> Self {
        Self {
            query,
            rpc,
            network,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub(crate) fn not_found(what: &str) -> ApiError {
    error_response(StatusCode::NOT_FOUND, format!("{what} not found"))
}

pub(crate) fn to_http_error(err: QueryError) -> ApiError {
    let status = match err {
        QueryError::InvalidLimit { .. } | QueryError::InvalidOffset(_) => StatusCode::BAD_REQUEST,
        QueryError::Chain(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

/// Run a datastore call on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        tracing::error!(error = %e, "datastore task failed");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "datastore task failed")
    })?
}

/// Public query, broadcast and construction routes.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/extended/v1/tx", get(tx::list_transactions))
        .route("/extended/v1/tx/mempool", get(tx::list_mempool))
        .route("/extended/v1/tx/:tx_id", get(tx::get_transaction))
        .route("/extended/v1/block/current", get(tx::current_block))
        .route("/extended/v1/block/:hash_or_height", get(tx::get_block))
        .route("/extended/v1/contract/:contract_id", get(tx::get_contract))
        .route("/extended/v1/status", get(tx::status))
        .route("/v2/transactions", post(tx::broadcast_transaction))
        .nest("/rosetta/v1", rosetta::router())
        .with_state(state)
}

/// Chain-node event receiver routes.
pub fn event_router(store: Arc<ChainStore>) -> Router {
    Router::new()
        .route("/new_block", post(events::new_block))
        .route("/new_burn_block", post(events::new_burn_block))
        .route("/new_microblocks", post(events::new_microblocks))
        .route("/new_mempool_tx", post(events::new_mempool_tx))
        .route("/drop_mempool_tx", post(events::drop_mempool_tx))
        .with_state(store)
}
