//! Settlement engine.
//!
//! [`Ledger`] is the only writer of balances, pools and market status. Each
//! mutating operation reads the clock once, runs inside a single store
//! transaction and either commits every effect or none.

use std::sync::Arc;

use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::LedgerRules;
use crate::error::{LedgerError, Result, USERS_PKEY_CONSTRAINT};
use crate::store::{LedgerStore, LedgerTx};
use crate::types::{Account, BetHistoryRow, Market, MarketWithOutcomes};

mod bets;
mod markets;
mod resolution;
mod rewards;

pub use markets::parse_expiry;
pub use resolution::Settlement;

pub struct Ledger<S> {
    store: S,
    clock: Arc<dyn Clock>,
    rules: LedgerRules,
}

impl<S: LedgerStore> Ledger<S> {
    pub fn new(store: S, rules: LedgerRules) -> Self {
        Self::with_clock(store, rules, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, rules: LedgerRules, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            rules,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn rules(&self) -> &LedgerRules {
        &self.rules
    }

    /// Create the ledger row for a user the identity layer has verified.
    pub async fn open_account(&self, user_id: Uuid) -> Result<Account> {
        let mut tx = self.store.begin().await?;

        match tx.insert_user(user_id, self.rules.initial_balance).await {
            Ok(()) => {}
            Err(e) if e.is_unique_violation(USERS_PKEY_CONSTRAINT) => {
                return Err(LedgerError::AccountExists(user_id));
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            balance = self.rules.initial_balance,
            "account opened"
        );

        Ok(Account {
            id: user_id,
            balance: self.rules.initial_balance,
            last_claimed_at: None,
        })
    }

    pub async fn account(&self, user_id: Uuid) -> Result<Account> {
        self.store
            .account(user_id)
            .await?
            .ok_or(LedgerError::UserNotFound(user_id))
    }

    pub async fn get_market(&self, market_id: Uuid) -> Result<MarketWithOutcomes> {
        self.store
            .market_with_outcomes(market_id)
            .await?
            .ok_or(LedgerError::MarketNotFound(market_id))
    }

    /// `limit` is clamped to `1..=max_page_size`.
    pub async fn list_latest_open_markets(&self, limit: i64) -> Result<Vec<MarketWithOutcomes>> {
        let limit = limit.clamp(1, self.rules.max_page_size);
        Ok(self
            .store
            .latest_open_markets(self.clock.now(), limit)
            .await?)
    }

    /// Expired, unresolved markets `resolver` is allowed to resolve.
    pub async fn list_pending_resolution(&self, resolver: Uuid) -> Result<Vec<Market>> {
        Ok(self
            .store
            .pending_resolution(resolver, self.clock.now())
            .await?)
    }

    pub async fn list_pending_admin_resolution(&self) -> Result<Vec<Market>> {
        Ok(self
            .store
            .pending_admin_resolution(self.clock.now())
            .await?)
    }

    pub async fn user_bet_history(&self, user_id: Uuid) -> Result<Vec<BetHistoryRow>> {
        Ok(self.store.bet_history(user_id).await?)
    }
}
