use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{LedgerStore, LedgerTx};
use crate::error::StoreError;
use crate::models::{BetHistoryRecord, BetRow, MarketRow, OutcomeRow, UserRow};
use crate::types::{
    Account, Bet, BetHistoryRow, Market, MarketDraft, MarketStatus, MarketWithOutcomes, NewBet,
    Outcome,
};

const MARKET_COLUMNS: &str = r#"
    id, title, description, category, resolver_type, resolver_ref, expires_at,
    status, created_by, resolved_outcome_id, resolved_at, resolved_by, created_at
"#;

/// Postgres-backed ledger. Row locks are `SELECT ... FOR UPDATE` / `FOR SHARE`
/// held until the surrounding transaction ends.
#[derive(Clone)]
pub struct PgLedger {
    db: PgPool,
}

impl PgLedger {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }

    async fn attach_outcomes(
        &self,
        markets: Vec<Market>,
    ) -> Result<Vec<MarketWithOutcomes>, StoreError> {
        if markets.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = markets.iter().map(|m| m.id).collect();

        let rows = sqlx::query_as::<_, OutcomeRow>(
            r#"
            SELECT id, market_id, label, pool_amount
            FROM outcomes
            WHERE market_id = ANY($1)
            ORDER BY label DESC
            "#,
        )
        .bind(ids)
        .fetch_all(&self.db)
        .await?;

        let mut by_market: HashMap<Uuid, Vec<Outcome>> = HashMap::new();
        for row in rows {
            by_market.entry(row.market_id).or_default().push(row.into());
        }

        Ok(markets
            .into_iter()
            .map(|market| MarketWithOutcomes {
                outcomes: by_market.remove(&market.id).unwrap_or_default(),
                market,
            })
            .collect())
    }
}

fn into_markets(rows: Vec<MarketRow>) -> Result<Vec<Market>, StoreError> {
    rows.into_iter().map(Market::try_from).collect()
}

#[async_trait]
impl LedgerStore for PgLedger {
    type Tx = PgLedgerTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let tx = self.db.begin().await?;
        Ok(PgLedgerTx { tx })
    }

    async fn account(&self, user_id: Uuid) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, balance, last_daily_claim FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Account::from))
    }

    async fn market_with_outcomes(
        &self,
        market_id: Uuid,
    ) -> Result<Option<MarketWithOutcomes>, StoreError> {
        let row = sqlx::query_as::<_, MarketRow>(&format!(
            "SELECT {MARKET_COLUMNS} FROM markets WHERE id = $1"
        ))
        .bind(market_id)
        .fetch_optional(&self.db)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut found = self.attach_outcomes(vec![Market::try_from(row)?]).await?;
        Ok(found.pop())
    }

    async fn latest_open_markets(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MarketWithOutcomes>, StoreError> {
        let rows = sqlx::query_as::<_, MarketRow>(&format!(
            r#"
            SELECT {MARKET_COLUMNS}
            FROM markets
            WHERE status = 'open' AND expires_at > $1
            ORDER BY expires_at DESC
            LIMIT $2
            "#
        ))
        .bind(now)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        self.attach_outcomes(into_markets(rows)?).await
    }

    async fn pending_resolution(
        &self,
        resolver: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Market>, StoreError> {
        let rows = sqlx::query_as::<_, MarketRow>(&format!(
            r#"
            SELECT {MARKET_COLUMNS}
            FROM markets
            WHERE resolver_type = 'creator'
              AND resolver_ref = $1
              AND expires_at < $2
              AND resolved_outcome_id IS NULL
            ORDER BY expires_at
            "#
        ))
        .bind(resolver)
        .bind(now)
        .fetch_all(&self.db)
        .await?;

        into_markets(rows)
    }

    async fn pending_admin_resolution(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Market>, StoreError> {
        let rows = sqlx::query_as::<_, MarketRow>(&format!(
            r#"
            SELECT {MARKET_COLUMNS}
            FROM markets
            WHERE resolver_type = 'admin'
              AND expires_at < $1
              AND resolved_outcome_id IS NULL
            ORDER BY expires_at
            "#
        ))
        .bind(now)
        .fetch_all(&self.db)
        .await?;

        into_markets(rows)
    }

    async fn bet_history(&self, user_id: Uuid) -> Result<Vec<BetHistoryRow>, StoreError> {
        let rows = sqlx::query_as::<_, BetHistoryRecord>(
            r#"
            SELECT
                b.id AS bet_id,
                m.id AS market_id,
                m.title AS market_title,
                m.status AS market_status,
                o.id AS outcome_id,
                o.label AS outcome_label,
                b.amount,
                b.payout_amount,
                b.created_at AS bet_created_at,
                m.expires_at AS market_expires_at
            FROM bets b
            JOIN markets m ON m.id = b.market_id
            JOIN outcomes o ON o.id = b.outcome_id
            WHERE b.user_id = $1
            ORDER BY b.created_at DESC, b.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(BetHistoryRow::try_from).collect()
    }
}

pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

impl PgLedgerTx {
    async fn select_market(
        &mut self,
        market_id: Uuid,
        lock: &str,
    ) -> Result<Option<Market>, StoreError> {
        let row = sqlx::query_as::<_, MarketRow>(&format!(
            "SELECT {MARKET_COLUMNS} FROM markets WHERE id = $1 {lock}"
        ))
        .bind(market_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Market::try_from).transpose()
    }
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn lock_user(&mut self, user_id: Uuid) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, balance, last_daily_claim
            FROM users
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Account::from))
    }

    async fn share_market(&mut self, market_id: Uuid) -> Result<Option<Market>, StoreError> {
        self.select_market(market_id, "FOR SHARE").await
    }

    async fn lock_market(&mut self, market_id: Uuid) -> Result<Option<Market>, StoreError> {
        self.select_market(market_id, "FOR UPDATE").await
    }

    async fn lock_outcome(&mut self, outcome_id: Uuid) -> Result<Option<Outcome>, StoreError> {
        let row = sqlx::query_as::<_, OutcomeRow>(
            r#"
            SELECT id, market_id, label, pool_amount
            FROM outcomes
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(outcome_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Outcome::from))
    }

    async fn market_outcomes(&mut self, market_id: Uuid) -> Result<Vec<Outcome>, StoreError> {
        let rows = sqlx::query_as::<_, OutcomeRow>(
            r#"
            SELECT id, market_id, label, pool_amount
            FROM outcomes
            WHERE market_id = $1
            ORDER BY label DESC
            "#,
        )
        .bind(market_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Outcome::from).collect())
    }

    async fn lock_market_bets(&mut self, market_id: Uuid) -> Result<Vec<Bet>, StoreError> {
        let rows = sqlx::query_as::<_, BetRow>(
            r#"
            SELECT id, user_id, market_id, outcome_id, amount, payout_amount, created_at, settled_at
            FROM bets
            WHERE market_id = $1
            ORDER BY created_at, id
            FOR UPDATE
            "#,
        )
        .bind(market_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Bet::from).collect())
    }

    async fn insert_user(&mut self, user_id: Uuid, balance: i64) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO users (id, balance) VALUES ($1, $2)")
            .bind(user_id)
            .bind(balance)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn insert_market(&mut self, draft: &MarketDraft) -> Result<Uuid, StoreError> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO markets
            (title, description, category, resolver_type, resolver_ref, expires_at, status, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.category.as_str())
        .bind(draft.resolver.kind())
        .bind(draft.resolver.resolver_ref())
        .bind(draft.expires_at)
        .bind(MarketStatus::Open.as_str())
        .bind(draft.created_by)
        .bind(draft.created_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(id)
    }

    async fn insert_outcome(&mut self, market_id: Uuid, label: &str) -> Result<Uuid, StoreError> {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO outcomes (market_id, label) VALUES ($1, $2) RETURNING id",
        )
        .bind(market_id)
        .bind(label)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(id)
    }

    async fn insert_bet(&mut self, bet: &NewBet) -> Result<Uuid, StoreError> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO bets (user_id, market_id, outcome_id, amount, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(bet.user_id)
        .bind(bet.market_id)
        .bind(bet.outcome_id)
        .bind(bet.amount)
        .bind(bet.created_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(id)
    }

    async fn debit_balance(&mut self, user_id: Uuid, amount: i64) -> Result<bool, StoreError> {
        let res = sqlx::query(
            r#"
            UPDATE users
            SET balance = balance - $1
            WHERE id = $2 AND balance >= $1
            "#,
        )
        .bind(amount)
        .bind(user_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(res.rows_affected() == 1)
    }

    async fn credit_balance(&mut self, user_id: Uuid, amount: i64) -> Result<bool, StoreError> {
        let res = sqlx::query("UPDATE users SET balance = balance + $1 WHERE id = $2")
            .bind(amount)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(res.rows_affected() == 1)
    }

    async fn add_to_pool(&mut self, outcome_id: Uuid, amount: i64) -> Result<bool, StoreError> {
        let res = sqlx::query("UPDATE outcomes SET pool_amount = pool_amount + $1 WHERE id = $2")
            .bind(amount)
            .bind(outcome_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(res.rows_affected() == 1)
    }

    async fn record_reward_claim(
        &mut self,
        user_id: Uuid,
        amount: i64,
        claimed_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let res = sqlx::query(
            r#"
            UPDATE users
            SET balance = balance + $1,
                last_daily_claim = $2
            WHERE id = $3
            "#,
        )
        .bind(amount)
        .bind(claimed_at)
        .bind(user_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(res.rows_affected() == 1)
    }

    async fn settle_bet(
        &mut self,
        bet_id: Uuid,
        payout: i64,
        settled_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let res = sqlx::query(
            r#"
            UPDATE bets
            SET payout_amount = $1,
                settled_at = $2
            WHERE id = $3 AND payout_amount IS NULL
            "#,
        )
        .bind(payout)
        .bind(settled_at)
        .bind(bet_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(res.rows_affected() == 1)
    }

    async fn mark_resolved(
        &mut self,
        market_id: Uuid,
        outcome_id: Uuid,
        resolved_by: Uuid,
        resolved_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let res = sqlx::query(
            r#"
            UPDATE markets
            SET status = $1,
                resolved_outcome_id = $2,
                resolved_at = $3,
                resolved_by = $4
            WHERE id = $5
              AND resolved_outcome_id IS NULL
            "#,
        )
        .bind(MarketStatus::Resolved.as_str())
        .bind(outcome_id)
        .bind(resolved_at)
        .bind(resolved_by)
        .bind(market_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(res.rows_affected() == 1)
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
