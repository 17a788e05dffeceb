pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod payout;
pub mod routes;
pub mod state;
pub mod store;
pub mod types;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

use axum::Router;
use state::AppState;
use store::LedgerStore;

pub fn app<S: LedgerStore>(state: AppState<S>) -> Router {
    routes::router(state)
}
