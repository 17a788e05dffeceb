//! Ledger storage contract.
//!
//! Every mutation of balances, pools, bets or market status goes through a
//! [`LedgerTx`]. A transaction that is dropped without [`LedgerTx::commit`]
//! is rolled back, so an early `?` return discards all staged work.
//!
//! Lock order for all engines: User, then Market, then Outcome, then Bets.
//! Settlement credits winners in user id order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::types::{
    Account, Bet, BetHistoryRow, Market, MarketDraft, MarketWithOutcomes, NewBet, Outcome,
};

pub mod postgres;

pub use postgres::PgLedger;

#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    type Tx: LedgerTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn account(&self, user_id: Uuid) -> Result<Option<Account>, StoreError>;

    async fn market_with_outcomes(
        &self,
        market_id: Uuid,
    ) -> Result<Option<MarketWithOutcomes>, StoreError>;

    /// Open markets not yet past expiry, latest expiry first.
    async fn latest_open_markets(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MarketWithOutcomes>, StoreError>;

    /// Expired, unresolved markets whose creator policy names `resolver`.
    async fn pending_resolution(
        &self,
        resolver: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Market>, StoreError>;

    /// Expired, unresolved markets under the admin policy.
    async fn pending_admin_resolution(&self, now: DateTime<Utc>)
    -> Result<Vec<Market>, StoreError>;

    /// Bets of a user, newest first.
    async fn bet_history(&self, user_id: Uuid) -> Result<Vec<BetHistoryRow>, StoreError>;
}

#[async_trait]
pub trait LedgerTx: Send {
    /// Select a user row and hold an exclusive lock on it.
    async fn lock_user(&mut self, user_id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Select a market row under a shared lock. Blocks resolution of the
    /// market until this transaction ends.
    async fn share_market(&mut self, market_id: Uuid) -> Result<Option<Market>, StoreError>;

    /// Select a market row and hold an exclusive lock on it.
    async fn lock_market(&mut self, market_id: Uuid) -> Result<Option<Market>, StoreError>;

    /// Select an outcome row and hold an exclusive lock on it.
    async fn lock_outcome(&mut self, outcome_id: Uuid) -> Result<Option<Outcome>, StoreError>;

    async fn market_outcomes(&mut self, market_id: Uuid) -> Result<Vec<Outcome>, StoreError>;

    /// Lock every bet of a market, ordered by creation time then id.
    async fn lock_market_bets(&mut self, market_id: Uuid) -> Result<Vec<Bet>, StoreError>;

    async fn insert_user(&mut self, user_id: Uuid, balance: i64) -> Result<(), StoreError>;

    async fn insert_market(&mut self, draft: &MarketDraft) -> Result<Uuid, StoreError>;

    async fn insert_outcome(&mut self, market_id: Uuid, label: &str) -> Result<Uuid, StoreError>;

    async fn insert_bet(&mut self, bet: &NewBet) -> Result<Uuid, StoreError>;

    /// Subtract from a balance only if it stays non-negative.
    async fn debit_balance(&mut self, user_id: Uuid, amount: i64) -> Result<bool, StoreError>;

    async fn credit_balance(&mut self, user_id: Uuid, amount: i64) -> Result<bool, StoreError>;

    async fn add_to_pool(&mut self, outcome_id: Uuid, amount: i64) -> Result<bool, StoreError>;

    /// Credit the reward and stamp the claim time.
    async fn record_reward_claim(
        &mut self,
        user_id: Uuid,
        amount: i64,
        claimed_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Write a bet's payout if it has none yet.
    async fn settle_bet(
        &mut self,
        bet_id: Uuid,
        payout: i64,
        settled_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Record the resolution if the market has none yet.
    async fn mark_resolved(
        &mut self,
        market_id: Uuid,
        outcome_id: Uuid,
        resolved_by: Uuid,
        resolved_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;
}
