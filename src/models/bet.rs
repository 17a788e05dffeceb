use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::StoreError;
use crate::types::{Bet, BetHistoryRow, BetResult, MarketStatus};

#[derive(Debug, FromRow)]
pub struct BetRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub market_id: Uuid,
    pub outcome_id: Uuid,
    pub amount: i64,
    pub payout_amount: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl From<BetRow> for Bet {
    fn from(row: BetRow) -> Self {
        Bet {
            id: row.id,
            user_id: row.user_id,
            market_id: row.market_id,
            outcome_id: row.outcome_id,
            amount: row.amount,
            payout: row.payout_amount,
            created_at: row.created_at,
            settled_at: row.settled_at,
        }
    }
}

/// Bet joined with its market and outcome.
#[derive(Debug, FromRow)]
pub struct BetHistoryRecord {
    pub bet_id: Uuid,
    pub market_id: Uuid,
    pub market_title: String,
    pub market_status: String,
    pub outcome_id: Uuid,
    pub outcome_label: String,
    pub amount: i64,
    pub payout_amount: Option<i64>,
    pub bet_created_at: DateTime<Utc>,
    pub market_expires_at: DateTime<Utc>,
}

impl TryFrom<BetHistoryRecord> for BetHistoryRow {
    type Error = StoreError;

    fn try_from(r: BetHistoryRecord) -> Result<Self, Self::Error> {
        let market_status = match r.market_status.as_str() {
            "open" => MarketStatus::Open,
            "resolved" => MarketStatus::Resolved,
            other => {
                return Err(StoreError::Corrupt {
                    table: "markets",
                    reason: format!("unknown status '{}'", other),
                });
            }
        };

        Ok(BetHistoryRow {
            bet_id: r.bet_id,
            market_id: r.market_id,
            market_title: r.market_title,
            market_status,
            outcome_id: r.outcome_id,
            outcome_label: r.outcome_label,
            amount: r.amount,
            payout: r.payout_amount,
            result: BetResult::derive(market_status, r.payout_amount),
            bet_created_at: r.bet_created_at,
            market_expires_at: r.market_expires_at,
        })
    }
}
