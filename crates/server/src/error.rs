//! Mapping of service errors onto HTTP responses.

use crate::service::ServiceError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracechain_chain::{LedgerError, MempoolError, ProductError};
use tracechain_network::NetworkError;

/// An error response: `{"success": false, "error": "..."}` with a matching status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

fn network_status(err: &NetworkError) -> StatusCode {
    match err {
        NetworkError::NodeNotFound(_) => StatusCode::NOT_FOUND,
        NetworkError::InvalidWeightKey(_) | NetworkError::InvalidWeight { .. } => {
            StatusCode::BAD_REQUEST
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let status = match &err {
            ServiceError::Network(e) | ServiceError::Product(ProductError::Network(e)) => {
                network_status(e)
            }
            ServiceError::Product(ProductError::ProductNotFound(_)) => StatusCode::NOT_FOUND,
            ServiceError::Product(ProductError::MissingField(_)) => StatusCode::BAD_REQUEST,
            ServiceError::Ledger(LedgerError::MalformedTransaction(_)) => StatusCode::BAD_REQUEST,
            ServiceError::Ledger(
                LedgerError::ChainCorruption(_) | LedgerError::StaleBlock { .. },
            ) => StatusCode::CONFLICT,
            ServiceError::Ledger(LedgerError::Mempool(MempoolError::DuplicateTransaction(_))) => {
                StatusCode::CONFLICT
            }
            ServiceError::Ledger(LedgerError::Mempool(MempoolError::MempoolFull(_))) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ServiceError::Ledger(LedgerError::Consensus(_) | LedgerError::InvalidConfig(_))
            | ServiceError::MiningAborted(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<NetworkError> for ApiError {
    fn from(err: NetworkError) -> Self {
        ServiceError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "request failed");
        }
        let body = Json(json!({
            "success": false,
            "error": self.message,
        }));
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracechain_consensus::ValidationError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ServiceError::Network(NetworkError::InvalidWeightKey("speed".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::Product(ProductError::ProductNotFound("p".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                ServiceError::Product(ProductError::Network(NetworkError::NodeNotFound("x".into()))),
                StatusCode::NOT_FOUND,
            ),
            (
                ServiceError::Ledger(LedgerError::MalformedTransaction(
                    ValidationError::MissingField("to"),
                )),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::Ledger(LedgerError::ChainCorruption(ValidationError::HashMismatch {
                    index: 1,
                })),
                StatusCode::CONFLICT,
            ),
            (
                ServiceError::Ledger(LedgerError::StaleBlock {
                    index: 1,
                    height: 1,
                }),
                StatusCode::CONFLICT,
            ),
            (
                ServiceError::Ledger(LedgerError::Mempool(MempoolError::MempoolFull(1))),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status, expected);
        }
    }
}
