use sqlx::FromRow;
use uuid::Uuid;

use crate::types::Outcome;

#[derive(Debug, FromRow)]
pub struct OutcomeRow {
    pub id: Uuid,
    pub market_id: Uuid,
    pub label: String,
    pub pool_amount: i64,
}

impl From<OutcomeRow> for Outcome {
    fn from(row: OutcomeRow) -> Self {
        Outcome {
            id: row.id,
            market_id: row.market_id,
            label: row.label,
            pool_amount: row.pool_amount,
        }
    }
}
