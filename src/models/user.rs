use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::Account;

#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub balance: i64,
    pub last_daily_claim: Option<DateTime<Utc>>,
}

impl From<UserRow> for Account {
    fn from(row: UserRow) -> Self {
        Account {
            id: row.id,
            balance: row.balance,
            last_claimed_at: row.last_daily_claim,
        }
    }
}
