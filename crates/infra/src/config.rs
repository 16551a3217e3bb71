//! Process configuration from `STOCKPOST_*` environment variables.
//!
//! Every variable is optional. Absent values fall back to defaults; present but
//! malformed values are an error rather than a silent fallback.

use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use stockpost_accounting::PostingAccounts;

use crate::auto_posting::MissingAccountPolicy;

pub const DEFAULT_PLACEHOLDER_UNIT_COST: Decimal = Decimal::from_parts(10000, 0, 0, false, 0);
pub const DEFAULT_NOTIFY_CHANNEL: &str = "stockpost.notifications";
pub const DEFAULT_OUTBOX_BATCH: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockpostConfig {
    /// Postgres URL; `None` selects the in-memory backend.
    pub database_url: Option<String>,
    pub placeholder_unit_cost: Decimal,
    pub accounts: PostingAccounts,
    pub missing_account_policy: MissingAccountPolicy,
    pub redis_url: Option<String>,
    pub notify_channel: String,
    pub outbox_batch: usize,
}

impl Default for StockpostConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            placeholder_unit_cost: DEFAULT_PLACEHOLDER_UNIT_COST,
            accounts: PostingAccounts::default(),
            missing_account_policy: MissingAccountPolicy::default(),
            redis_url: None,
            notify_channel: DEFAULT_NOTIFY_CHANNEL.to_string(),
            outbox_batch: DEFAULT_OUTBOX_BATCH,
        }
    }
}

impl StockpostConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let placeholder_unit_cost = match get("STOCKPOST_PLACEHOLDER_UNIT_COST") {
            Some(raw) => {
                let cost = parse::<Decimal>("STOCKPOST_PLACEHOLDER_UNIT_COST", &raw)?;
                if cost < Decimal::ZERO {
                    return Err(ConfigError::Invalid {
                        var: "STOCKPOST_PLACEHOLDER_UNIT_COST",
                        reason: "must not be negative".to_string(),
                    });
                }
                cost
            }
            None => defaults.placeholder_unit_cost,
        };

        let accounts = PostingAccounts {
            inventory: get("STOCKPOST_ACCOUNT_INVENTORY").unwrap_or(defaults.accounts.inventory),
            payable: get("STOCKPOST_ACCOUNT_PAYABLE").unwrap_or(defaults.accounts.payable),
            cogs: get("STOCKPOST_ACCOUNT_COGS").unwrap_or(defaults.accounts.cogs),
        };

        let missing_account_policy = match get("STOCKPOST_MISSING_ACCOUNT_POLICY") {
            Some(raw) => parse("STOCKPOST_MISSING_ACCOUNT_POLICY", &raw)?,
            None => defaults.missing_account_policy,
        };

        let outbox_batch = match get("STOCKPOST_OUTBOX_BATCH") {
            Some(raw) => match parse::<usize>("STOCKPOST_OUTBOX_BATCH", &raw)? {
                0 => {
                    return Err(ConfigError::Invalid {
                        var: "STOCKPOST_OUTBOX_BATCH",
                        reason: "must be at least 1".to_string(),
                    });
                }
                n => n,
            },
            None => defaults.outbox_batch,
        };

        let database_url = get("STOCKPOST_DATABASE_URL");
        if database_url.is_none() {
            debug!("STOCKPOST_DATABASE_URL not set; using in-memory backend");
        }

        Ok(Self {
            database_url,
            placeholder_unit_cost,
            accounts,
            missing_account_policy,
            redis_url: get("STOCKPOST_REDIS_URL"),
            notify_channel: get("STOCKPOST_NOTIFY_CHANNEL").unwrap_or(defaults.notify_channel),
            outbox_batch,
        })
    }
}

fn parse<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}
