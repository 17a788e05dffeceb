use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::StoreError;
use crate::types::{Category, Market, MarketStatus, Resolution, ResolverPolicy};

#[derive(Debug, FromRow)]
pub struct MarketRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub resolver_type: String,
    pub resolver_ref: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub status: String,
    pub created_by: Uuid,
    pub resolved_outcome_id: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

fn corrupt(reason: String) -> StoreError {
    StoreError::Corrupt {
        table: "markets",
        reason,
    }
}

impl TryFrom<MarketRow> for Market {
    type Error = StoreError;

    fn try_from(row: MarketRow) -> Result<Self, Self::Error> {
        let category = Category::parse(&row.category)
            .ok_or_else(|| corrupt(format!("unknown category '{}'", row.category)))?;

        let resolver = match (row.resolver_type.as_str(), row.resolver_ref) {
            ("creator", Some(resolver)) => ResolverPolicy::Creator { resolver },
            ("creator", None) => {
                return Err(corrupt(format!("creator market {} has no resolver", row.id)));
            }
            ("admin", _) => ResolverPolicy::Admin,
            (other, _) => return Err(corrupt(format!("unknown resolver type '{}'", other))),
        };

        let status = match row.status.as_str() {
            "open" => MarketStatus::Open,
            "resolved" => MarketStatus::Resolved,
            other => return Err(corrupt(format!("unknown status '{}'", other))),
        };

        let resolution = match (row.resolved_outcome_id, row.resolved_at, row.resolved_by) {
            (Some(outcome_id), Some(resolved_at), Some(resolved_by)) => Some(Resolution {
                outcome_id,
                resolved_at,
                resolved_by,
            }),
            (None, None, None) => None,
            _ => {
                return Err(corrupt(format!(
                    "market {} has a partial resolution record",
                    row.id
                )));
            }
        };

        Ok(Market {
            id: row.id,
            title: row.title,
            description: row.description,
            category,
            resolver,
            expires_at: row.expires_at,
            status,
            created_by: row.created_by,
            resolution,
            created_at: row.created_at,
        })
    }
}
