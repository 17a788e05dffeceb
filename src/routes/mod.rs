use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;
use crate::store::LedgerStore;

pub mod accounts;
pub mod auth;
pub mod bets;
pub mod error;
pub mod markets;

pub fn router<S: LedgerStore>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/accounts", post(accounts::open_account::<S>))
        .route("/me", get(accounts::me::<S>))
        .route("/me/daily-reward", post(accounts::claim_daily_reward::<S>))
        .route("/me/bets", get(bets::history::<S>))
        .route("/me/pending-resolution", get(markets::pending_resolution::<S>))
        .route(
            "/markets",
            post(markets::create_market::<S>).get(markets::list_markets::<S>),
        )
        .route("/markets/:id", get(markets::get_market::<S>))
        .route("/markets/:id/bets", post(bets::place_bet::<S>))
        .route("/markets/:id/resolve", post(markets::resolve_market::<S>))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}
