use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::Ledger;
use crate::error::{LedgerError, Result};
use crate::payout::{self, Distribution};
use crate::store::{LedgerStore, LedgerTx};
use crate::types::Authority;

#[derive(Debug, Clone, Serialize)]
pub struct Settlement {
    pub market_id: Uuid,
    pub resolved_by: Uuid,
    pub resolved_at: DateTime<Utc>,
    pub distribution: Distribution,
}

impl<S: LedgerStore> Ledger<S> {
    /// Resolve a creator-policy market on behalf of its designated resolver.
    pub async fn resolve_market(
        &self,
        market_id: Uuid,
        requesting_user: Uuid,
        winning_outcome_id: Uuid,
    ) -> Result<Settlement> {
        self.settle(market_id, Authority::User(requesting_user), winning_outcome_id)
            .await
    }

    /// Resolve an admin-policy market. The caller has already checked the
    /// admin role.
    pub async fn resolve_market_as_admin(
        &self,
        market_id: Uuid,
        admin_id: Uuid,
        winning_outcome_id: Uuid,
    ) -> Result<Settlement> {
        self.settle(market_id, Authority::Admin(admin_id), winning_outcome_id)
            .await
    }

    async fn settle(
        &self,
        market_id: Uuid,
        authority: Authority,
        winning_outcome_id: Uuid,
    ) -> Result<Settlement> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let market = tx
            .lock_market(market_id)
            .await?
            .ok_or(LedgerError::MarketNotFound(market_id))?;

        if !authority.may_resolve(&market.resolver) {
            return Err(LedgerError::UserNotAuthorized);
        }

        if market.resolution.is_some() {
            return Err(LedgerError::MarketAlreadyResolved);
        }

        if now < market.expires_at {
            return Err(LedgerError::MarketNotExpired);
        }

        let outcomes = tx.market_outcomes(market_id).await?;
        if !outcomes.iter().any(|o| o.id == winning_outcome_id) {
            return Err(LedgerError::OutcomeDoesNotBelongToMarket);
        }

        let bets = tx.lock_market_bets(market_id).await?;

        let pools: i64 = outcomes.iter().map(|o| o.pool_amount).sum();
        let stakes: i64 = bets.iter().map(|b| b.amount).sum();
        if pools != stakes {
            tracing::error!(
                market_id = %market_id,
                pools,
                stakes,
                "outcome pools disagree with recorded bets"
            );
            return Err(LedgerError::PoolMismatch {
                market_id,
                pools,
                stakes,
            });
        }

        let distribution = payout::distribute(&bets, winning_outcome_id);

        for p in &distribution.payouts {
            if !tx.settle_bet(p.bet_id, p.amount, now).await? {
                tracing::warn!(
                    market_id = %market_id,
                    bet_id = %p.bet_id,
                    "bet already carries a payout"
                );
                return Err(LedgerError::MarketAlreadyResolved);
            }
        }

        // user rows are locked in id order
        for (user_id, amount) in distribution.credits() {
            if !tx.credit_balance(user_id, amount).await? {
                return Err(LedgerError::UserNotFound(user_id));
            }
        }

        let resolved_by = authority.user_id();
        if !tx
            .mark_resolved(market_id, winning_outcome_id, resolved_by, now)
            .await?
        {
            tracing::warn!(market_id = %market_id, "lost resolution race");
            return Err(LedgerError::MarketAlreadyResolved);
        }

        tx.commit().await?;

        tracing::info!(
            market_id = %market_id,
            outcome_id = %winning_outcome_id,
            resolved_by = %resolved_by,
            total_pool = distribution.total_pool,
            winning_pool = distribution.winning_pool,
            leftover = distribution.leftover,
            undistributed = distribution.undistributed(),
            "market resolved"
        );

        Ok(Settlement {
            market_id,
            resolved_by,
            resolved_at: now,
            distribution,
        })
    }
}
