use uuid::Uuid;

use super::Ledger;
use crate::error::{LedgerError, Result};
use crate::store::{LedgerStore, LedgerTx};
use crate::types::Account;

impl<S: LedgerStore> Ledger<S> {
    /// Credit the daily reward once per cooldown window.
    pub async fn claim_daily_reward(&self, user_id: Uuid) -> Result<Account> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let user = tx
            .lock_user(user_id)
            .await?
            .ok_or(LedgerError::UserNotFound(user_id))?;

        if let Some(last) = user.last_claimed_at {
            let next_claim_at = last + self.rules.reward_cooldown;
            if now < next_claim_at {
                return Err(LedgerError::DailyRewardNotAvailable { next_claim_at });
            }
        }

        let reward = self.rules.daily_reward;
        if !tx.record_reward_claim(user_id, reward, now).await? {
            return Err(LedgerError::UserNotFound(user_id));
        }

        tx.commit().await?;

        tracing::info!(user_id = %user_id, reward, "daily reward claimed");

        Ok(Account {
            id: user_id,
            balance: user.balance + reward,
            last_claimed_at: Some(now),
        })
    }
}
