use uuid::Uuid;

use super::Ledger;
use crate::error::{BET_PER_MARKET_CONSTRAINT, LedgerError, Result};
use crate::store::{LedgerStore, LedgerTx};
use crate::types::{MarketStatus, NewBet};

impl<S: LedgerStore> Ledger<S> {
    /// Stake `amount` of the user's balance on one outcome of a market.
    ///
    /// Locks the user row, then the market row (shared, so a concurrent
    /// resolution waits for this placement), then the outcome row. Returns the
    /// new bet id.
    pub async fn place_bet(
        &self,
        user_id: Uuid,
        market_id: Uuid,
        outcome_id: Uuid,
        amount: i64,
    ) -> Result<Uuid> {
        if amount < self.rules.minimum_stake {
            return Err(LedgerError::StakeBelowMinimum {
                amount,
                minimum: self.rules.minimum_stake,
            });
        }

        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let user = tx
            .lock_user(user_id)
            .await?
            .ok_or(LedgerError::UserNotFound(user_id))?;

        if user.balance < amount {
            return Err(LedgerError::InsufficientBalance {
                balance: user.balance,
                amount,
            });
        }

        let market = tx
            .share_market(market_id)
            .await?
            .ok_or(LedgerError::MarketNotFound(market_id))?;

        if now > market.expires_at {
            return Err(LedgerError::MarketExpired);
        }

        if market.status != MarketStatus::Open {
            return Err(LedgerError::MarketNotOpen);
        }

        match tx.lock_outcome(outcome_id).await? {
            Some(outcome) if outcome.market_id == market_id => {}
            _ => return Err(LedgerError::OutcomeNotFound),
        }

        let bet = NewBet {
            user_id,
            market_id,
            outcome_id,
            amount,
            created_at: now,
        };

        let bet_id = match tx.insert_bet(&bet).await {
            Ok(id) => id,
            Err(e) if e.is_unique_violation(BET_PER_MARKET_CONSTRAINT) => {
                return Err(LedgerError::UserAlreadyBetOnMarket);
            }
            Err(e) => return Err(e.into()),
        };

        if !tx.debit_balance(user_id, amount).await? {
            return Err(LedgerError::InsufficientBalance {
                balance: user.balance,
                amount,
            });
        }

        if !tx.add_to_pool(outcome_id, amount).await? {
            return Err(LedgerError::OutcomeNotFound);
        }

        tx.commit().await?;

        tracing::info!(
            bet_id = %bet_id,
            user_id = %user_id,
            market_id = %market_id,
            outcome_id = %outcome_id,
            amount,
            "bet placed"
        );

        Ok(bet_id)
    }
}
