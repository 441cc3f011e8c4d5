//! Construction endpoints: derive, preprocess, metadata and hash.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use sidecar_core::{
    address_from_public_key, decode_auth_header, format_hash, is_valid_c32_address,
    transaction_id,
};

use super::errors::RosettaError;
use super::types::{
    ConstructionMetadata, ConstructionOptions, DeriveRequest, DeriveResponse, HashRequest,
    HashResponse, MetadataRequest, MetadataResponse, NetworkIdentifier, Operation,
    PreprocessRequest, PreprocessResponse, PublicKey, TransactionIdentifier,
};
use super::{BLOCKCHAIN, CURVE_TYPE, DECIMALS, SYMBOL, TOKEN_TRANSFER};
use crate::api::AppState;
use crate::config::Network;
use crate::core_rpc::RpcError;

fn parse_request<T: DeserializeOwned>(body: &[u8]) -> Result<T, RosettaError> {
    serde_json::from_slice(body).map_err(|e| RosettaError::InvalidRequest(e.to_string()))
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x").unwrap_or(s)
}

pub fn check_network(id: &NetworkIdentifier, network: Network) -> Result<(), RosettaError> {
    if id.blockchain != BLOCKCHAIN || id.network != network.as_str() {
        return Err(RosettaError::InvalidNetwork);
    }
    Ok(())
}

/// Address of a secp256k1 public key on `network`.
pub fn derive_address(
    public_key: &PublicKey,
    network: Network,
) -> Result<DeriveResponse, RosettaError> {
    if public_key.curve_type != CURVE_TYPE {
        return Err(RosettaError::InvalidCurveType);
    }
    let bytes = hex::decode(strip_hex_prefix(&public_key.hex_bytes))
        .map_err(|_| RosettaError::InvalidPublicKey)?;
    let address = address_from_public_key(&bytes, network.address_version())
        .map_err(|_| RosettaError::InvalidPublicKey)?;
    Ok(DeriveResponse { address })
}

/// Collect transfer options from a fee operation and two transfer legs.
///
/// The debit leg names the sender and the credit leg names the recipient
/// and the amount. Anything else yields `None`.
fn options_from_operations(operations: &[Operation]) -> Option<ConstructionOptions> {
    let mut options = ConstructionOptions::default();
    for op in operations {
        let amount = op.amount.as_ref()?;
        match op.op_type.as_str() {
            "fee" => {
                if options.fee.replace(amount.magnitude().to_string()).is_some() {
                    return None;
                }
            }
            TOKEN_TRANSFER => {
                let address = op.account.as_ref()?.address.clone();
                if amount.is_debit() {
                    if options.sender_address.replace(address).is_some() {
                        return None;
                    }
                } else {
                    if options.token_transfer_recipient_address.replace(address).is_some() {
                        return None;
                    }
                    options.amount = Some(amount.magnitude().to_string());
                }
                if options.status.is_none() {
                    options.status = op.status.clone();
                }
                options.symbol = Some(amount.currency.symbol.clone());
                options.decimals = Some(amount.currency.decimals);
            }
            _ => return None,
        }
    }
    if options.fee.is_none()
        || options.sender_address.is_none()
        || options.token_transfer_recipient_address.is_none()
    {
        return None;
    }
    options.tx_type = Some(TOKEN_TRANSFER.to_string());
    Some(options)
}

/// Validate a transfer and turn it into construction options.
pub fn preprocess(request: PreprocessRequest) -> Result<PreprocessResponse, RosettaError> {
    if request.operations.len() != 3 {
        return Err(RosettaError::InvalidOperation);
    }

    let currencies = || {
        request
            .operations
            .iter()
            .filter_map(|op| op.amount.as_ref())
            .map(|amount| &amount.currency)
    };
    if currencies().any(|c| c.symbol != SYMBOL) {
        return Err(RosettaError::InvalidCurrencySymbol);
    }
    if currencies().any(|c| c.decimals != DECIMALS) {
        return Err(RosettaError::InvalidCurrencyDecimals);
    }

    let mut options =
        options_from_operations(&request.operations).ok_or(RosettaError::InvalidOperation)?;

    if let Some(metadata) = request.metadata {
        if metadata.gas_limit.is_some() {
            options.gas_limit = metadata.gas_limit;
        }
        if metadata.gas_price.is_some() {
            options.gas_price = metadata.gas_price;
        }
    }
    options.suggested_fee_multiplier = request.suggested_fee_multiplier;

    if let Some(max_fee) = request.max_fee {
        let fee = max_fee.first().ok_or(RosettaError::InvalidFee)?;
        if fee.currency.symbol != SYMBOL || fee.currency.decimals != DECIMALS {
            return Err(RosettaError::InvalidFee);
        }
        options.max_fee = Some(fee.value.clone());
    }

    Ok(PreprocessResponse { options })
}

/// Validate metadata options and pick the account whose nonce is needed:
/// the sender when present, otherwise the recipient.
pub fn nonce_account(options: &ConstructionOptions) -> Result<&str, RosettaError> {
    if options.tx_type.as_deref() != Some(TOKEN_TRANSFER) {
        return Err(RosettaError::InvalidTransactionType);
    }
    if let Some(sender) = options.sender_address.as_deref() {
        if !is_valid_c32_address(sender) {
            return Err(RosettaError::InvalidSender);
        }
    }
    if options.symbol.as_deref() != Some(SYMBOL) {
        return Err(RosettaError::InvalidCurrencySymbol);
    }
    if options.decimals != Some(DECIMALS) {
        return Err(RosettaError::InvalidCurrencyDecimals);
    }
    let recipient = options
        .token_transfer_recipient_address
        .as_deref()
        .filter(|address| is_valid_c32_address(address))
        .ok_or(RosettaError::InvalidRecipient)?;
    Ok(options.sender_address.as_deref().unwrap_or(recipient))
}

/// Map a failed nonce lookup onto the construction error taxonomy.
///
/// A 4xx answer means the node refused the address itself, which no retry
/// will fix. Anything else is an upstream outage.
pub fn account_lookup_error(account: &str, is_sender: bool, err: RpcError) -> RosettaError {
    match err {
        RpcError::Rejected { status, body } if (400..500).contains(&status) => {
            warn!(%account, status, %body, "chain node refused account lookup");
            if is_sender {
                RosettaError::InvalidSender
            } else {
                RosettaError::InvalidRecipient
            }
        }
        other => {
            warn!(%account, error = %other, "account lookup failed");
            RosettaError::UpstreamUnavailable(other.to_string())
        }
    }
}

/// Transaction id of a signed single-sig transaction.
pub fn hash_transaction(signed_transaction: &str) -> Result<HashResponse, RosettaError> {
    let raw = hex::decode(strip_hex_prefix(signed_transaction))
        .map_err(|_| RosettaError::InvalidTransactionString)?;
    let header = decode_auth_header(&raw).map_err(|e| {
        debug!(error = %e, "undecodable signed transaction");
        RosettaError::InvalidTransactionString
    })?;
    if !header.is_signed() {
        return Err(RosettaError::TransactionNotSigned);
    }
    Ok(HashResponse {
        transaction_identifier: TransactionIdentifier {
            hash: format_hash(&transaction_id(&raw)),
        },
    })
}

pub(crate) async fn derive(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<DeriveResponse>, RosettaError> {
    let request: DeriveRequest = parse_request(&body)?;
    check_network(&request.network_identifier, state.network)?;
    derive_address(&request.public_key, state.network).map(Json)
}

pub(crate) async fn preprocess_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PreprocessResponse>, RosettaError> {
    let request: PreprocessRequest = parse_request(&body)?;
    check_network(&request.network_identifier, state.network)?;
    preprocess(request).map(Json)
}

pub(crate) async fn metadata(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<MetadataResponse>, RosettaError> {
    let request: MetadataRequest = parse_request(&body)?;
    check_network(&request.network_identifier, state.network)?;
    let account = nonce_account(&request.options)?.to_string();
    let is_sender = request.options.sender_address.is_some();

    let info = state
        .rpc
        .get_account(&account)
        .await
        .map_err(|e| account_lookup_error(&account, is_sender, e))?;

    let query = state.query.clone();
    let current = tokio::task::spawn_blocking(move || query.current_block())
        .await
        .map_err(|e| RosettaError::UpstreamUnavailable(e.to_string()))?
        .map_err(|e| RosettaError::UpstreamUnavailable(e.to_string()))?;

    Ok(Json(MetadataResponse {
        metadata: ConstructionMetadata {
            options: request.options,
            account_sequence: info.nonce,
            recent_block_hash: current.into_option().map(|b| format_hash(&b.block_hash)),
        },
    }))
}

pub(crate) async fn hash(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<HashResponse>, RosettaError> {
    let request: HashRequest = parse_request(&body)?;
    check_network(&request.network_identifier, state.network)?;
    hash_transaction(&request.signed_transaction).map(Json)
}
