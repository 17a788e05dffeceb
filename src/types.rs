use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: Uuid,
    pub balance: i64,
    pub last_claimed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Friends,
    Crypto,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Friends => "friends",
            Category::Crypto => "crypto",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "friends" => Some(Category::Friends),
            "crypto" => Some(Category::Crypto),
            _ => None,
        }
    }
}

/// Who may declare the winning outcome of a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResolverPolicy {
    /// Only this user may resolve.
    Creator { resolver: Uuid },
    /// Any caller holding the admin role may resolve.
    Admin,
}

impl ResolverPolicy {
    pub fn kind(&self) -> &'static str {
        match self {
            ResolverPolicy::Creator { .. } => "creator",
            ResolverPolicy::Admin => "admin",
        }
    }

    pub fn resolver_ref(&self) -> Option<Uuid> {
        match self {
            ResolverPolicy::Creator { resolver } => Some(*resolver),
            ResolverPolicy::Admin => None,
        }
    }
}

/// The identity a resolution request is made under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    User(Uuid),
    Admin(Uuid),
}

impl Authority {
    pub fn user_id(&self) -> Uuid {
        match self {
            Authority::User(id) | Authority::Admin(id) => *id,
        }
    }

    pub fn may_resolve(&self, policy: &ResolverPolicy) -> bool {
        match (policy, self) {
            (ResolverPolicy::Creator { resolver }, Authority::User(user)) => resolver == user,
            (ResolverPolicy::Admin, Authority::Admin(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    Open,
    Resolved,
}

impl MarketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MarketStatus::Open => "open",
            MarketStatus::Resolved => "resolved",
        }
    }
}

/// Status as seen at a given instant; `Expired` is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Open,
    Expired,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub outcome_id: Uuid,
    pub resolved_at: DateTime<Utc>,
    pub resolved_by: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Market {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub resolver: ResolverPolicy,
    pub expires_at: DateTime<Utc>,
    pub status: MarketStatus,
    pub created_by: Uuid,
    pub resolution: Option<Resolution>,
    pub created_at: DateTime<Utc>,
}

impl Market {
    pub fn lifecycle(&self, now: DateTime<Utc>) -> Lifecycle {
        match self.status {
            MarketStatus::Resolved => Lifecycle::Resolved,
            MarketStatus::Open if now > self.expires_at => Lifecycle::Expired,
            MarketStatus::Open => Lifecycle::Open,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub id: Uuid,
    pub market_id: Uuid,
    pub label: String,
    pub pool_amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketWithOutcomes {
    #[serde(flatten)]
    pub market: Market,
    pub outcomes: Vec<Outcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub market_id: Uuid,
    pub outcome_id: Uuid,
    pub amount: i64,
    pub payout: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewBet {
    pub user_id: Uuid,
    pub market_id: Uuid,
    pub outcome_id: Uuid,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// A market row ready to be inserted.
#[derive(Debug, Clone)]
pub struct MarketDraft {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub resolver: ResolverPolicy,
    pub expires_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BetResult {
    Pending,
    Win,
    Lose,
}

impl BetResult {
    pub fn derive(status: MarketStatus, payout: Option<i64>) -> Self {
        match (status, payout) {
            (MarketStatus::Open, _) => BetResult::Pending,
            (MarketStatus::Resolved, Some(p)) if p > 0 => BetResult::Win,
            (MarketStatus::Resolved, _) => BetResult::Lose,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BetHistoryRow {
    pub bet_id: Uuid,
    pub market_id: Uuid,
    pub market_title: String,
    pub market_status: MarketStatus,
    pub outcome_id: Uuid,
    pub outcome_label: String,
    pub amount: i64,
    pub payout: Option<i64>,
    pub result: BetResult,
    pub bet_created_at: DateTime<Utc>,
    pub market_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    Creator,
    Admin,
}

#[derive(Debug, Deserialize)]
pub struct CreateMarketRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    pub resolver: ResolverKind,
    // local wall-clock time in the resolution timezone, e.g. 2026-03-01T18:30
    pub expires_at: String,
}

#[derive(Debug, Deserialize)]
pub struct PlaceBetRequest {
    pub outcome_id: Uuid,
    pub amount: i64,
}

#[derive(Debug, Serialize)]
pub struct PlaceBetResponse {
    pub bet_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ResolveMarketRequest {
    pub outcome_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ListMarketsQuery {
    pub limit: Option<i64>,
}
