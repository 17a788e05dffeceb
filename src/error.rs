use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Unique constraint guarding one bet per user per market.
pub const BET_PER_MARKET_CONSTRAINT: &str = "bets_market_id_user_id_key";

/// Primary key constraint on the users table.
pub const USERS_PKEY_CONSTRAINT: &str = "users_pkey";

/// Failures raised by a ledger store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("lock not acquired: {0}")]
    LockFailure(#[source] sqlx::Error),

    #[error("corrupt row in {table}: {reason}")]
    Corrupt { table: &'static str, reason: String },

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl StoreError {
    pub fn is_unique_violation(&self, name: &str) -> bool {
        matches!(self, StoreError::UniqueViolation { constraint } if constraint == name)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        let (code, constraint) = match e.as_database_error() {
            Some(db_err) => (
                db_err.code().map(|c| c.into_owned()),
                db_err.constraint().map(str::to_string),
            ),
            None => return StoreError::Database(e),
        };

        match code.as_deref() {
            Some("23505") => StoreError::UniqueViolation {
                constraint: constraint.unwrap_or_default(),
            },
            // deadlock_detected, lock_not_available, serialization_failure
            Some("40P01") | Some("55P03") | Some("40001") => StoreError::LockFailure(e),
            _ => StoreError::Database(e),
        }
    }
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("stake of {amount} is below the minimum of {minimum}")]
    StakeBelowMinimum { amount: i64, minimum: i64 },

    #[error("invalid expiry '{input}': {reason}")]
    InvalidExpiry { input: String, reason: String },

    #[error("invalid market: {0}")]
    InvalidMarket(String),

    #[error("user {0} not found")]
    UserNotFound(Uuid),

    #[error("market {0} not found")]
    MarketNotFound(Uuid),

    #[error("account {0} already exists")]
    AccountExists(Uuid),

    #[error("you cannot place a bet that is higher than your current balance")]
    InsufficientBalance { balance: i64, amount: i64 },

    #[error("you cannot place a bet in an expired market")]
    MarketExpired,

    #[error("you cannot place a bet in a market that is not open")]
    MarketNotOpen,

    #[error("the selected outcome does not exist in the selected market")]
    OutcomeNotFound,

    #[error("user has already placed a bet on this market")]
    UserAlreadyBetOnMarket,

    #[error("user not authorized to resolve this market")]
    UserNotAuthorized,

    #[error("this market has already been resolved")]
    MarketAlreadyResolved,

    #[error("market has not expired yet")]
    MarketNotExpired,

    #[error("this outcome does not belong to this market")]
    OutcomeDoesNotBelongToMarket,

    #[error("daily reward already claimed, next claim at {next_claim_at}")]
    DailyRewardNotAvailable { next_claim_at: DateTime<Utc> },

    #[error("pool mismatch on market {market_id}: outcomes hold {pools}, bets hold {stakes}")]
    PoolMismatch {
        market_id: Uuid,
        pools: i64,
        stakes: i64,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Whether a fresh attempt of the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Store(StoreError::LockFailure(_)))
    }
}

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;
