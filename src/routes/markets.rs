use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use super::auth::VerifiedUser;
use super::error::ApiError;
use crate::ledger::Settlement;
use crate::state::AppState;
use crate::store::LedgerStore;
use crate::types::{
    CreateMarketRequest, ListMarketsQuery, Market, MarketWithOutcomes, ResolveMarketRequest,
    ResolverKind, ResolverPolicy,
};

const DEFAULT_PAGE: i64 = 10;

pub async fn create_market<S: LedgerStore>(
    State(state): State<AppState<S>>,
    user: VerifiedUser,
    Json(payload): Json<CreateMarketRequest>,
) -> Result<(StatusCode, Json<MarketWithOutcomes>), ApiError> {
    if payload.resolver == ResolverKind::Admin && !user.is_admin {
        return Err(ApiError::Forbidden);
    }

    let market = state.ledger.create_market(user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(market)))
}

pub async fn list_markets<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<ListMarketsQuery>,
) -> Result<Json<Vec<MarketWithOutcomes>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE);
    Ok(Json(state.ledger.list_latest_open_markets(limit).await?))
}

pub async fn get_market<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(market_id): Path<Uuid>,
) -> Result<Json<MarketWithOutcomes>, ApiError> {
    Ok(Json(state.ledger.get_market(market_id).await?))
}

pub async fn pending_resolution<S: LedgerStore>(
    State(state): State<AppState<S>>,
    user: VerifiedUser,
) -> Result<Json<Vec<Market>>, ApiError> {
    let mut markets = state.ledger.list_pending_resolution(user.id).await?;

    if user.is_admin {
        markets.extend(state.ledger.list_pending_admin_resolution().await?);
        markets.sort_by_key(|m| m.expires_at);
    }

    Ok(Json(markets))
}

/// The market's policy picks the entry point; authorization is checked again
/// under the market row lock.
pub async fn resolve_market<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(market_id): Path<Uuid>,
    user: VerifiedUser,
    Json(payload): Json<ResolveMarketRequest>,
) -> Result<Json<Settlement>, ApiError> {
    let market = state.ledger.get_market(market_id).await?.market;

    let settlement = match market.resolver {
        ResolverPolicy::Admin if user.is_admin => {
            state
                .ledger
                .resolve_market_as_admin(market_id, user.id, payload.outcome_id)
                .await?
        }
        ResolverPolicy::Admin => return Err(ApiError::Forbidden),
        ResolverPolicy::Creator { .. } => {
            state
                .ledger
                .resolve_market(market_id, user.id, payload.outcome_id)
                .await?
        }
    };

    Ok(Json(settlement))
}
