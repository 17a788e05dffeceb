use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use super::auth::VerifiedUser;
use super::error::ApiError;
use crate::state::AppState;
use crate::store::LedgerStore;
use crate::types::{BetHistoryRow, PlaceBetRequest, PlaceBetResponse};

pub async fn place_bet<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(market_id): Path<Uuid>,
    user: VerifiedUser,
    Json(payload): Json<PlaceBetRequest>,
) -> Result<(StatusCode, Json<PlaceBetResponse>), ApiError> {
    let bet_id = state
        .ledger
        .place_bet(user.id, market_id, payload.outcome_id, payload.amount)
        .await?;

    Ok((StatusCode::CREATED, Json(PlaceBetResponse { bet_id })))
}

pub async fn history<S: LedgerStore>(
    State(state): State<AppState<S>>,
    user: VerifiedUser,
) -> Result<Json<Vec<BetHistoryRow>>, ApiError> {
    Ok(Json(state.ledger.user_bet_history(user.id).await?))
}
