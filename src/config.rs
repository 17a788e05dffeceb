use std::net::SocketAddr;

use chrono::Duration;
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Monetary rules of the ledger, in the smallest currency unit.
#[derive(Debug, Clone)]
pub struct LedgerRules {
    pub minimum_stake: i64,
    pub daily_reward: i64,
    pub reward_cooldown: Duration,
    pub initial_balance: i64,
    pub max_page_size: i64,
    /// Timezone market expiry strings are written in.
    pub resolution_timezone: Tz,
}

impl Default for LedgerRules {
    fn default() -> Self {
        Self {
            minimum_stake: 100,
            daily_reward: 1000,
            reward_cooldown: Duration::hours(24),
            initial_balance: 1000,
            max_page_size: 50,
            resolution_timezone: chrono_tz::Europe::Madrid,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    pub rules: LedgerRules,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let defaults = LedgerRules::default();
        let rules = LedgerRules {
            minimum_stake: parse_or(&lookup, "MIN_STAKE", defaults.minimum_stake)?,
            daily_reward: parse_or(&lookup, "DAILY_REWARD", defaults.daily_reward)?,
            initial_balance: parse_or(&lookup, "INITIAL_BALANCE", defaults.initial_balance)?,
            max_page_size: parse_or(&lookup, "MAX_MARKET_PAGE", defaults.max_page_size)?,
            resolution_timezone: match lookup("RESOLUTION_TIMEZONE") {
                Some(raw) => parse_timezone(&raw)?,
                None => defaults.resolution_timezone,
            },
            reward_cooldown: defaults.reward_cooldown,
        };

        for (field, value) in [
            ("MIN_STAKE", rules.minimum_stake),
            ("DAILY_REWARD", rules.daily_reward),
            ("MAX_MARKET_PAGE", rules.max_page_size),
        ] {
            if value <= 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be positive".to_string(),
                });
            }
        }
        if rules.initial_balance < 0 {
            return Err(ConfigError::InvalidValue {
                field: "INITIAL_BALANCE",
                reason: "must not be negative".to_string(),
            });
        }

        Ok(Config {
            database_url,
            bind_addr: parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?,
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            rules,
        })
    }
}

fn parse_or<F, T>(lookup: &F, field: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(field) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            field,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// IANA zone name such as `Europe/Madrid`.
pub fn parse_timezone(raw: &str) -> Result<Tz, ConfigError> {
    raw.trim().parse::<Tz>().map_err(|_| ConfigError::InvalidValue {
        field: "RESOLUTION_TIMEZONE",
        reason: format!("unknown timezone '{}'", raw.trim()),
    })
}
