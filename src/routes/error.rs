use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::{LedgerError, StoreError};

#[derive(Debug)]
pub enum ApiError {
    Unauthenticated(&'static str),
    Forbidden,
    Ledger(LedgerError),
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        ApiError::Ledger(e)
    }
}

pub fn status_for(e: &LedgerError) -> StatusCode {
    match e {
        LedgerError::StakeBelowMinimum { .. }
        | LedgerError::InvalidExpiry { .. }
        | LedgerError::InvalidMarket(_) => StatusCode::UNPROCESSABLE_ENTITY,

        LedgerError::UserNotFound(_) | LedgerError::MarketNotFound(_) => StatusCode::NOT_FOUND,

        LedgerError::UserNotAuthorized => StatusCode::FORBIDDEN,

        LedgerError::AccountExists(_)
        | LedgerError::InsufficientBalance { .. }
        | LedgerError::MarketExpired
        | LedgerError::MarketNotOpen
        | LedgerError::OutcomeNotFound
        | LedgerError::UserAlreadyBetOnMarket
        | LedgerError::MarketAlreadyResolved
        | LedgerError::MarketNotExpired
        | LedgerError::OutcomeDoesNotBelongToMarket
        | LedgerError::DailyRewardNotAvailable { .. } => StatusCode::CONFLICT,

        LedgerError::Store(StoreError::LockFailure(_)) => StatusCode::SERVICE_UNAVAILABLE,

        LedgerError::PoolMismatch { .. } | LedgerError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Unauthenticated(reason) => (StatusCode::UNAUTHORIZED, reason.to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "admin role required".to_string()),
            ApiError::Ledger(e) => {
                let status = status_for(e);
                if status.is_server_error() {
                    tracing::error!(
                        error = %e,
                        retryable = e.is_retryable(),
                        "ledger operation failed"
                    );
                    // store internals stay in the log
                    (status, "internal error".to_string())
                } else {
                    tracing::warn!(error = %e, "ledger operation rejected");
                    (status, e.to_string())
                }
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
