use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use super::Ledger;
use crate::error::{LedgerError, Result};
use crate::store::{LedgerStore, LedgerTx};
use crate::types::{
    CreateMarketRequest, Market, MarketDraft, MarketStatus, MarketWithOutcomes, Outcome,
    ResolverKind, ResolverPolicy,
};

const EXPIRY_FORMAT: &str = "%Y-%m-%dT%H:%M";
const OUTCOME_LABELS: [&str; 2] = ["yes", "no"];

/// Parse a `YYYY-MM-DDTHH:MM` wall-clock time written in `tz`.
///
/// Times skipped or repeated by a daylight-saving transition are rejected.
pub fn parse_expiry(input: &str, tz: Tz) -> Result<DateTime<Utc>> {
    let invalid = |reason: String| LedgerError::InvalidExpiry {
        input: input.to_string(),
        reason,
    };

    let naive = NaiveDateTime::parse_from_str(input.trim(), EXPIRY_FORMAT)
        .map_err(|e| invalid(e.to_string()))?;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => Ok(t.with_timezone(&Utc)),
        LocalResult::Ambiguous(..) => Err(invalid(format!(
            "local time occurs twice in {}",
            tz.name()
        ))),
        LocalResult::None => Err(invalid(format!("local time does not exist in {}", tz.name()))),
    }
}

impl<S: LedgerStore> Ledger<S> {
    /// Create a binary market with empty `yes` and `no` pools.
    pub async fn create_market(
        &self,
        creator: Uuid,
        req: CreateMarketRequest,
    ) -> Result<MarketWithOutcomes> {
        let now = self.clock.now();

        let title = req.title.trim();
        if title.is_empty() {
            return Err(LedgerError::InvalidMarket(
                "title must not be blank".to_string(),
            ));
        }

        let expires_at = parse_expiry(&req.expires_at, self.rules.resolution_timezone)?;
        if expires_at <= now {
            return Err(LedgerError::InvalidExpiry {
                input: req.expires_at,
                reason: "must be in the future".to_string(),
            });
        }

        let resolver = match req.resolver {
            ResolverKind::Creator => ResolverPolicy::Creator { resolver: creator },
            ResolverKind::Admin => ResolverPolicy::Admin,
        };

        let draft = MarketDraft {
            title: title.to_string(),
            description: req.description.trim().to_string(),
            category: req.category,
            resolver,
            expires_at,
            created_by: creator,
            created_at: now,
        };

        let mut tx = self.store.begin().await?;

        tx.lock_user(creator)
            .await?
            .ok_or(LedgerError::UserNotFound(creator))?;

        let market_id = tx.insert_market(&draft).await?;

        let mut outcomes = Vec::with_capacity(OUTCOME_LABELS.len());
        for label in OUTCOME_LABELS {
            let id = tx.insert_outcome(market_id, label).await?;
            outcomes.push(Outcome {
                id,
                market_id,
                label: label.to_string(),
                pool_amount: 0,
            });
        }

        tx.commit().await?;

        tracing::info!(
            market_id = %market_id,
            created_by = %creator,
            resolver = draft.resolver.kind(),
            expires_at = %expires_at,
            "market created"
        );

        Ok(MarketWithOutcomes {
            market: Market {
                id: market_id,
                title: draft.title,
                description: draft.description,
                category: draft.category,
                resolver: draft.resolver,
                expires_at,
                status: MarketStatus::Open,
                created_by: creator,
                resolution: None,
                created_at: now,
            },
            outcomes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::{America, Europe};

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn expiry_follows_daylight_saving() {
        let winter = parse_expiry("2026-03-02T13:00", Europe::Madrid).unwrap();
        assert_eq!(winter, utc(2026, 3, 2, 12, 0));

        let summer = parse_expiry("2026-07-01T12:00", Europe::Madrid).unwrap();
        assert_eq!(summer, utc(2026, 7, 1, 10, 0));
    }

    #[test]
    fn same_string_differs_across_zones() {
        let a = parse_expiry("2026-03-02T13:00", chrono_tz::UTC).unwrap();
        let b = parse_expiry("2026-03-02T13:00", America::New_York).unwrap();

        assert_eq!(b - a, chrono::Duration::hours(5));
    }

    #[test]
    fn skipped_and_repeated_local_times_are_rejected() {
        // clocks jump from 02:00 to 03:00 on 2026-03-29
        let err = parse_expiry("2026-03-29T02:30", Europe::Madrid).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidExpiry { .. }));

        // and fall back from 03:00 to 02:00 on 2026-10-25
        let err = parse_expiry("2026-10-25T02:30", Europe::Madrid).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidExpiry { .. }));

        assert_eq!(
            parse_expiry("2026-10-25T03:30", Europe::Madrid).unwrap(),
            utc(2026, 10, 25, 2, 30)
        );
    }

    #[test]
    fn malformed_expiry_is_rejected() {
        for input in ["2026-03-02", "02/03/2026 13:00", "2026-13-02T13:00", ""] {
            let err = parse_expiry(input, chrono_tz::UTC).unwrap_err();
            assert!(matches!(err, LedgerError::InvalidExpiry { .. }), "{input}");
        }
    }
}
