//! Construction API errors with fixed codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every failure the construction endpoints can answer with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosettaError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("network identifier does not match this node")]
    InvalidNetwork,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid curve type")]
    InvalidCurveType,

    #[error("invalid operation")]
    InvalidOperation,

    #[error("invalid currency symbol")]
    InvalidCurrencySymbol,

    #[error("invalid currency decimals")]
    InvalidCurrencyDecimals,

    #[error("invalid fee")]
    InvalidFee,

    #[error("invalid transaction type")]
    InvalidTransactionType,

    #[error("invalid sender address")]
    InvalidSender,

    #[error("invalid recipient address")]
    InvalidRecipient,

    #[error("invalid transaction string")]
    InvalidTransactionString,

    #[error("transaction not signed")]
    TransactionNotSigned,

    #[error("upstream service unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl RosettaError {
    pub fn code(&self) -> u32 {
        match self {
            RosettaError::InvalidRequest(_) => 601,
            RosettaError::InvalidNetwork => 602,
            RosettaError::InvalidPublicKey => 603,
            RosettaError::InvalidCurveType => 604,
            RosettaError::InvalidOperation => 605,
            RosettaError::InvalidCurrencySymbol => 606,
            RosettaError::InvalidCurrencyDecimals => 607,
            RosettaError::InvalidFee => 608,
            RosettaError::InvalidTransactionType => 609,
            RosettaError::InvalidSender => 610,
            RosettaError::InvalidRecipient => 611,
            RosettaError::InvalidTransactionString => 612,
            RosettaError::TransactionNotSigned => 613,
            RosettaError::UpstreamUnavailable(_) => 614,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            RosettaError::InvalidRequest(_) => "Invalid request",
            RosettaError::InvalidNetwork => "Network identifier object is not valid",
            RosettaError::InvalidPublicKey => "Invalid public key",
            RosettaError::InvalidCurveType => "Invalid curve type",
            RosettaError::InvalidOperation => "Invalid operation",
            RosettaError::InvalidCurrencySymbol => "Invalid currency symbol",
            RosettaError::InvalidCurrencyDecimals => "Invalid currency decimals",
            RosettaError::InvalidFee => "Invalid fee",
            RosettaError::InvalidTransactionType => "Invalid transaction type",
            RosettaError::InvalidSender => "Invalid sender address",
            RosettaError::InvalidRecipient => "Invalid recipient address",
            RosettaError::InvalidTransactionString => "Invalid transaction string",
            RosettaError::TransactionNotSigned => "Transaction not signed",
            RosettaError::UpstreamUnavailable(_) => "Upstream service unavailable",
        }
    }

    pub fn retriable(&self) -> bool {
        matches!(self, RosettaError::UpstreamUnavailable(_))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RosettaError::UpstreamUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn body(&self) -> RosettaErrorBody {
        let details = match self {
            RosettaError::InvalidRequest(reason) | RosettaError::UpstreamUnavailable(reason) => {
                Some(ErrorDetails {
                    error: reason.clone(),
                })
            }
            _ => None,
        };
        RosettaErrorBody {
            code: self.code(),
            message: self.message().to_string(),
            retriable: self.retriable(),
            details,
        }
    }
}

/// Wire form of a [`RosettaError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosettaErrorBody {
    pub code: u32,
    pub message: String,
    pub retriable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub error: String,
}

impl IntoResponse for RosettaError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
