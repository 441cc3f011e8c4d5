//! Rosetta construction adapter.
//!
//! Only native token transfers between single-sig accounts are supported.
//! Every request names its network; a mismatch with the configured network
//! is rejected before anything else is looked at.

pub mod construction;
pub mod errors;
pub mod types;

use axum::routing::post;
use axum::Router;

use super::AppState;

pub use errors::{RosettaError, RosettaErrorBody};

/// Blockchain name in network identifiers.
pub const BLOCKCHAIN: &str = "stacks";

/// Native currency symbol.
pub const SYMBOL: &str = "STX";

/// Native currency decimals.
pub const DECIMALS: u32 = 6;

/// The only supported key curve.
pub const CURVE_TYPE: &str = "secp256k1";

/// Operation and transaction type of a transfer.
pub const TOKEN_TRANSFER: &str = "token_transfer";

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/construction/derive", post(construction::derive))
        .route("/construction/preprocess", post(construction::preprocess_handler))
        .route("/construction/metadata", post(construction::metadata))
        .route("/construction/hash", post(construction::hash))
}
