//! Query endpoints and the broadcast passthrough.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::{info, warn};

use sidecar_chain::{BlockQuery, Order, QueryService};
use sidecar_core::{parse_hash, Block, FoundOrNot, Hash32};

use super::views::{
    BlockView, ContractView, ListView, MempoolTransactionView, StatusView, TransactionLookupView,
    TransactionView,
};
use super::{blocking, error_response, not_found, to_http_error, ApiError, AppState};
use crate::core_rpc::RpcError;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    limit: Option<usize>,
    offset: Option<usize>,
    order: Option<Order>,
}

fn parse_tx_id(raw: &str) -> Result<Hash32, ApiError> {
    parse_hash(raw).map_err(|e| {
        error_response(StatusCode::BAD_REQUEST, format!("invalid transaction id: {e}"))
    })
}

pub(crate) async fn list_transactions(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<ListView<TransactionView>>, ApiError> {
    let query = state.query.clone();
    blocking(move || {
        let (request, page) = query
            .transactions(params.limit, params.offset, params.order)
            .map_err(to_http_error)?;
        let results = page.results.iter().map(TransactionView::from).collect();
        Ok(Json(ListView::new(request, page.total, results)))
    })
    .await
}

pub(crate) async fn list_mempool(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<ListView<MempoolTransactionView>>, ApiError> {
    let query = state.query.clone();
    blocking(move || {
        let (request, page) = query
            .mempool(params.limit, params.offset, params.order)
            .map_err(to_http_error)?;
        let results = page.results.iter().map(MempoolTransactionView::from).collect();
        Ok(Json(ListView::new(request, page.total, results)))
    })
    .await
}

/// Canonical instance first, then a pending mempool entry, then the most
/// recent orphaned instance.
pub(crate) async fn get_transaction(
    State(state): State<AppState>,
    Path(tx_id): Path<String>,
) -> Result<Json<TransactionLookupView>, ApiError> {
    let tx_id = parse_tx_id(&tx_id)?;
    let query = state.query.clone();
    blocking(move || {
        let mined = query.transaction(&tx_id).map_err(to_http_error)?.into_option();
        if let Some(tx) = mined.as_ref().filter(|tx| tx.canonical) {
            return Ok(Json(TransactionLookupView::Mined(TransactionView::from(tx))));
        }
        if let FoundOrNot::Found(pending) =
            query.pending_transaction(&tx_id).map_err(to_http_error)?
        {
            return Ok(Json(TransactionLookupView::Pending(
                MempoolTransactionView::from(&pending),
            )));
        }
        match mined {
            Some(tx) => Ok(Json(TransactionLookupView::Mined(TransactionView::from(&tx)))),
            None => Err(not_found("transaction")),
        }
    })
    .await
}

fn block_view(query: &QueryService, block: FoundOrNot<Block>) -> Result<Json<BlockView>, ApiError> {
    let block = block.into_option().ok_or_else(|| not_found("block"))?;
    let txs = query
        .block_transactions(&block.block_hash)
        .map_err(to_http_error)?;
    Ok(Json(BlockView::new(&block, &txs)))
}

pub(crate) async fn get_block(
    State(state): State<AppState>,
    Path(hash_or_height): Path<String>,
) -> Result<Json<BlockView>, ApiError> {
    let block_query: BlockQuery = hash_or_height
        .parse()
        .map_err(|e: String| error_response(StatusCode::BAD_REQUEST, e))?;
    let query = state.query.clone();
    blocking(move || {
        let block = query.block(block_query).map_err(to_http_error)?;
        block_view(&query, block)
    })
    .await
}

pub(crate) async fn current_block(
    State(state): State<AppState>,
) -> Result<Json<BlockView>, ApiError> {
    let query = state.query.clone();
    blocking(move || {
        let block = query.current_block().map_err(to_http_error)?;
        block_view(&query, block)
    })
    .await
}

pub(crate) async fn get_contract(
    State(state): State<AppState>,
    Path(contract_id): Path<String>,
) -> Result<Json<ContractView>, ApiError> {
    let query = state.query.clone();
    blocking(move || {
        let contract = query
            .smart_contract(&contract_id)
            .map_err(to_http_error)?
            .into_option()
            .ok_or_else(|| not_found("contract"))?;
        Ok(Json(ContractView::from(&contract)))
    })
    .await
}

pub(crate) async fn status(State(state): State<AppState>) -> Result<Json<StatusView>, ApiError> {
    let query = state.query.clone();
    blocking(move || {
        let stats = query.status().map_err(to_http_error)?;
        Ok(Json(StatusView::from(&stats)))
    })
    .await
}

/// Forward a serialized transaction to the chain node unmodified.
pub(crate) async fn broadcast_transaction(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<String>, ApiError> {
    if body.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "empty transaction body",
        ));
    }
    match state.rpc.broadcast_transaction(body.to_vec()).await {
        Ok(tx_id) => {
            info!(%tx_id, "broadcast transaction");
            Ok(Json(tx_id))
        }
        Err(RpcError::Rejected { status, body }) => {
            warn!(status, "chain node rejected transaction");
            Err(error_response(StatusCode::BAD_REQUEST, body))
        }
        Err(e) => {
            warn!(error = %e, "broadcast failed");
            Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}
