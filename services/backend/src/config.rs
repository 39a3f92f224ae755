use anyhow::Context;
use promo_shared::{MAX_BATCH_SIZE, MAX_ISSUE_ATTEMPTS};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api_port: u16,
    pub metrics_port: u16,
    pub store: StoreBackend,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub admin: AdminConfig,
    pub issuance: IssuanceConfig,
}

/// Which `PromoRepository` implementation backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Redis,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "redis" => Ok(StoreBackend::Redis),
            "memory" => Ok(StoreBackend::Memory),
            other => anyhow::bail!("unknown PROMO_STORE '{}': expected postgres, redis or memory", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Required when the store is Postgres
    pub url: Option<String>,
    pub pool_size: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Clone, Default, Deserialize)]
pub struct AdminConfig {
    /// `None` keeps every admin route closed
    pub token: Option<String>,
}

impl fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IssuanceConfig {
    pub max_batch_size: usize,
    pub max_attempts: u32,
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self {
            max_batch_size: MAX_BATCH_SIZE,
            max_attempts: MAX_ISSUE_ATTEMPTS,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let store: StoreBackend = var("PROMO_STORE", "postgres").parse()?;
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        if store == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set when PROMO_STORE=postgres");
        }

        let issuance = IssuanceConfig {
            max_batch_size: var("PROMO_MAX_BATCH_SIZE", &MAX_BATCH_SIZE.to_string())
                .parse()
                .context("PROMO_MAX_BATCH_SIZE must be an integer")?,
            max_attempts: var("PROMO_MAX_ISSUE_ATTEMPTS", &MAX_ISSUE_ATTEMPTS.to_string())
                .parse()
                .context("PROMO_MAX_ISSUE_ATTEMPTS must be an integer")?,
        };
        if !(1..=MAX_BATCH_SIZE).contains(&issuance.max_batch_size) {
            anyhow::bail!("PROMO_MAX_BATCH_SIZE must be between 1 and {}", MAX_BATCH_SIZE);
        }
        if issuance.max_attempts < 1 {
            anyhow::bail!("PROMO_MAX_ISSUE_ATTEMPTS must be at least 1");
        }

        Ok(Config {
            api_port: var("API_PORT", "8000")
                .parse()
                .context("API_PORT must be a port number")?,
            metrics_port: var("METRICS_PORT", "9090")
                .parse()
                .context("METRICS_PORT must be a port number")?,
            store,
            database: DatabaseConfig {
                url: database_url,
                pool_size: var("DATABASE_POOL_SIZE", "20")
                    .parse()
                    .context("DATABASE_POOL_SIZE must be an integer")?,
                acquire_timeout_secs: var("DATABASE_ACQUIRE_TIMEOUT_SECS", "5")
                    .parse()
                    .context("DATABASE_ACQUIRE_TIMEOUT_SECS must be an integer")?,
            },
            redis: RedisConfig {
                url: var("REDIS_URL", "redis://localhost:6379"),
            },
            admin: AdminConfig {
                token: lookup("PROMO_ADMIN_TOKEN").filter(|token| !token.is_empty()),
            },
            issuance,
        })
    }
}
