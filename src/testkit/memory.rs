//! In-process ledger store.
//!
//! A transaction holds the single table lock for its whole lifetime and works
//! on a private copy of the tables, which replaces the shared copy on commit.
//! Transactions are therefore fully serialized, which satisfies every row lock
//! the engines ask for.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::{BET_PER_MARKET_CONSTRAINT, StoreError, USERS_PKEY_CONSTRAINT};
use crate::store::{LedgerStore, LedgerTx};
use crate::types::{
    Account, Bet, BetHistoryRow, BetResult, Market, MarketDraft, MarketStatus,
    MarketWithOutcomes, NewBet, Outcome, Resolution, ResolverPolicy,
};

#[derive(Debug, Default, Clone)]
struct Tables {
    users: HashMap<Uuid, Account>,
    markets: HashMap<Uuid, Market>,
    outcomes: HashMap<Uuid, Outcome>,
    bets: Vec<Bet>,
}

impl Tables {
    fn outcomes_of(&self, market_id: Uuid) -> Vec<Outcome> {
        let mut found: Vec<Outcome> = self
            .outcomes
            .values()
            .filter(|o| o.market_id == market_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.label.cmp(&a.label));
        found
    }

    fn with_outcomes(&self, market: &Market) -> MarketWithOutcomes {
        MarketWithOutcomes {
            market: market.clone(),
            outcomes: self.outcomes_of(market.id),
        }
    }

    fn pending<F>(&self, now: DateTime<Utc>, policy: F) -> Vec<Market>
    where
        F: Fn(&ResolverPolicy) -> bool,
    {
        let mut found: Vec<Market> = self
            .markets
            .values()
            .filter(|m| policy(&m.resolver) && m.expires_at < now && m.resolution.is_none())
            .cloned()
            .collect();
        found.sort_by_key(|m| m.expires_at);
        found
    }
}

#[derive(Clone, Default)]
pub struct MemoryLedger {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every bet of a market, in insertion order.
    pub async fn bets_of(&self, market_id: Uuid) -> Vec<Bet> {
        let t = self.tables.lock().await;
        t.bets
            .iter()
            .filter(|b| b.market_id == market_id)
            .cloned()
            .collect()
    }

    /// Overwrite a pool, bypassing the engines.
    pub async fn force_pool(&self, outcome_id: Uuid, pool_amount: i64) {
        let mut t = self.tables.lock().await;
        if let Some(o) = t.outcomes.get_mut(&outcome_id) {
            o.pool_amount = pool_amount;
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryTx { guard, staged })
    }

    async fn account(&self, user_id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.tables.lock().await.users.get(&user_id).cloned())
    }

    async fn market_with_outcomes(
        &self,
        market_id: Uuid,
    ) -> Result<Option<MarketWithOutcomes>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.markets.get(&market_id).map(|m| t.with_outcomes(m)))
    }

    async fn latest_open_markets(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MarketWithOutcomes>, StoreError> {
        let t = self.tables.lock().await;
        let mut open: Vec<&Market> = t
            .markets
            .values()
            .filter(|m| m.status == MarketStatus::Open && m.expires_at > now)
            .collect();
        open.sort_by(|a, b| b.expires_at.cmp(&a.expires_at));

        Ok(open
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|m| t.with_outcomes(m))
            .collect())
    }

    async fn pending_resolution(
        &self,
        resolver: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Market>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.pending(now, |p| p.resolver_ref() == Some(resolver)))
    }

    async fn pending_admin_resolution(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Market>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.pending(now, |p| *p == ResolverPolicy::Admin))
    }

    async fn bet_history(&self, user_id: Uuid) -> Result<Vec<BetHistoryRow>, StoreError> {
        let t = self.tables.lock().await;
        let mut rows = Vec::new();

        for bet in t.bets.iter().filter(|b| b.user_id == user_id) {
            let (Some(market), Some(outcome)) =
                (t.markets.get(&bet.market_id), t.outcomes.get(&bet.outcome_id))
            else {
                continue;
            };

            rows.push(BetHistoryRow {
                bet_id: bet.id,
                market_id: market.id,
                market_title: market.title.clone(),
                market_status: market.status,
                outcome_id: outcome.id,
                outcome_label: outcome.label.clone(),
                amount: bet.amount,
                payout: bet.payout,
                result: BetResult::derive(market.status, bet.payout),
                bet_created_at: bet.created_at,
                market_expires_at: market.expires_at,
            });
        }

        rows.sort_by(|a, b| {
            b.bet_created_at
                .cmp(&a.bet_created_at)
                .then(a.bet_id.cmp(&b.bet_id))
        });
        Ok(rows)
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn lock_user(&mut self, user_id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.staged.users.get(&user_id).cloned())
    }

    async fn share_market(&mut self, market_id: Uuid) -> Result<Option<Market>, StoreError> {
        Ok(self.staged.markets.get(&market_id).cloned())
    }

    async fn lock_market(&mut self, market_id: Uuid) -> Result<Option<Market>, StoreError> {
        Ok(self.staged.markets.get(&market_id).cloned())
    }

    async fn lock_outcome(&mut self, outcome_id: Uuid) -> Result<Option<Outcome>, StoreError> {
        Ok(self.staged.outcomes.get(&outcome_id).cloned())
    }

    async fn market_outcomes(&mut self, market_id: Uuid) -> Result<Vec<Outcome>, StoreError> {
        Ok(self.staged.outcomes_of(market_id))
    }

    async fn lock_market_bets(&mut self, market_id: Uuid) -> Result<Vec<Bet>, StoreError> {
        let mut bets: Vec<Bet> = self
            .staged
            .bets
            .iter()
            .filter(|b| b.market_id == market_id)
            .cloned()
            .collect();
        bets.sort_by_key(|b| (b.created_at, b.id));
        Ok(bets)
    }

    async fn insert_user(&mut self, user_id: Uuid, balance: i64) -> Result<(), StoreError> {
        if self.staged.users.contains_key(&user_id) {
            return Err(StoreError::UniqueViolation {
                constraint: USERS_PKEY_CONSTRAINT.to_string(),
            });
        }

        self.staged.users.insert(
            user_id,
            Account {
                id: user_id,
                balance,
                last_claimed_at: None,
            },
        );
        Ok(())
    }

    async fn insert_market(&mut self, draft: &MarketDraft) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        self.staged.markets.insert(
            id,
            Market {
                id,
                title: draft.title.clone(),
                description: draft.description.clone(),
                category: draft.category,
                resolver: draft.resolver,
                expires_at: draft.expires_at,
                status: MarketStatus::Open,
                created_by: draft.created_by,
                resolution: None,
                created_at: draft.created_at,
            },
        );
        Ok(id)
    }

    async fn insert_outcome(&mut self, market_id: Uuid, label: &str) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        self.staged.outcomes.insert(
            id,
            Outcome {
                id,
                market_id,
                label: label.to_string(),
                pool_amount: 0,
            },
        );
        Ok(id)
    }

    async fn insert_bet(&mut self, bet: &NewBet) -> Result<Uuid, StoreError> {
        let duplicate = self
            .staged
            .bets
            .iter()
            .any(|b| b.user_id == bet.user_id && b.market_id == bet.market_id);
        if duplicate {
            return Err(StoreError::UniqueViolation {
                constraint: BET_PER_MARKET_CONSTRAINT.to_string(),
            });
        }

        let id = Uuid::new_v4();
        self.staged.bets.push(Bet {
            id,
            user_id: bet.user_id,
            market_id: bet.market_id,
            outcome_id: bet.outcome_id,
            amount: bet.amount,
            payout: None,
            created_at: bet.created_at,
            settled_at: None,
        });
        Ok(id)
    }

    async fn debit_balance(&mut self, user_id: Uuid, amount: i64) -> Result<bool, StoreError> {
        match self.staged.users.get_mut(&user_id) {
            Some(user) if user.balance >= amount => {
                user.balance -= amount;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn credit_balance(&mut self, user_id: Uuid, amount: i64) -> Result<bool, StoreError> {
        match self.staged.users.get_mut(&user_id) {
            Some(user) => {
                user.balance += amount;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn add_to_pool(&mut self, outcome_id: Uuid, amount: i64) -> Result<bool, StoreError> {
        match self.staged.outcomes.get_mut(&outcome_id) {
            Some(outcome) => {
                outcome.pool_amount += amount;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_reward_claim(
        &mut self,
        user_id: Uuid,
        amount: i64,
        claimed_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        match self.staged.users.get_mut(&user_id) {
            Some(user) => {
                user.balance += amount;
                user.last_claimed_at = Some(claimed_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn settle_bet(
        &mut self,
        bet_id: Uuid,
        payout: i64,
        settled_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        match self
            .staged
            .bets
            .iter_mut()
            .find(|b| b.id == bet_id && b.payout.is_none())
        {
            Some(bet) => {
                bet.payout = Some(payout);
                bet.settled_at = Some(settled_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_resolved(
        &mut self,
        market_id: Uuid,
        outcome_id: Uuid,
        resolved_by: Uuid,
        resolved_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        match self.staged.markets.get_mut(&market_id) {
            Some(market) if market.resolution.is_none() => {
                market.status = MarketStatus::Resolved;
                market.resolution = Some(Resolution {
                    outcome_id,
                    resolved_at,
                    resolved_by,
                });
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit(self) -> Result<(), StoreError> {
        let MemoryTx { mut guard, staged } = self;
        *guard = staged;
        Ok(())
    }
}
