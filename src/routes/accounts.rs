use axum::{Json, extract::State, http::StatusCode};

use super::auth::VerifiedUser;
use super::error::ApiError;
use crate::state::AppState;
use crate::store::LedgerStore;
use crate::types::Account;

/// Open the ledger account of the verified caller.
pub async fn open_account<S: LedgerStore>(
    State(state): State<AppState<S>>,
    user: VerifiedUser,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let account = state.ledger.open_account(user.id).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn me<S: LedgerStore>(
    State(state): State<AppState<S>>,
    user: VerifiedUser,
) -> Result<Json<Account>, ApiError> {
    Ok(Json(state.ledger.account(user.id).await?))
}

pub async fn claim_daily_reward<S: LedgerStore>(
    State(state): State<AppState<S>>,
    user: VerifiedUser,
) -> Result<Json<Account>, ApiError> {
    Ok(Json(state.ledger.claim_daily_reward(user.id).await?))
}
